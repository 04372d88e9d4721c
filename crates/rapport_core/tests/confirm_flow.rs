use rapport_core::db::open_db_in_memory;
use rapport_core::model::person::{NewPerson, Profile};
use rapport_core::model::record::EventDraft;
use rapport_core::model::Source;
use rapport_core::reconcile::LengthPreference;
use rapport_core::repo::person_repo::{PersonRepository, SqlitePersonRepository};
use rapport_core::repo::record_repo::{RecordRepository, SqliteRecordRepository};
use rapport_core::repo::relation_repo::{RelationRepository, SqliteRelationRepository};
use rapport_core::service::confirm_service::{ConfirmRequest, ConfirmService};
use rapport_core::service::person_service::PersonService;
use rapport_core::ServiceError;
use serde_json::{json, Value};

fn request(value: Value) -> ConfirmRequest {
    serde_json::from_value(value).unwrap()
}

#[test]
fn new_person_is_created_with_deduplicated_records_and_stub_relations() {
    let conn = open_db_in_memory().unwrap();
    let service = ConfirmService::new(&conn, &LengthPreference);

    let response = service
        .confirm(&request(json!({
            "original_text": "王五是医生，生日5月20日，喜欢跑步。",
            "is_new_person": true,
            "profile": {
                "name": " 王五 ",
                "job": "医生",
                "birthday": "05-20",
                "notes": ["喜欢跑步", "喜欢跑步"],
                "events": [{"date": "2026-02-20", "location": "公园", "description": "一起跑步"}]
            },
            "annotations": [
                {"time": "2026-03", "description": "去北京开会"},
                {"time": "2026-03", "description": "去北京开会"}
            ],
            "developments": [{"content": "医疗资源", "type": "resource"}],
            "relations": [
                {"name": "赵六", "relation_type": "同事"},
                {"name": "王五", "relation_type": "自己"}
            ]
        })))
        .unwrap();

    assert!(response.success);
    assert!(response.result.is_none());

    let detail = PersonService::new(&conn)
        .get_person_detail(response.person_id)
        .unwrap();
    assert_eq!(detail.person.name, "王五");
    assert_eq!(detail.person.profile.job.as_deref(), Some("医生"));
    assert_eq!(detail.person.profile.notes, vec!["喜欢跑步"]);
    assert_eq!(detail.events.len(), 1);
    assert_eq!(detail.events[0].location.as_deref(), Some("公园"));
    assert_eq!(detail.events[0].source, Source::User);
    assert_eq!(detail.annotations.len(), 1);
    assert_eq!(detail.developments.len(), 1);

    let stub = SqlitePersonRepository::new(&conn)
        .find_person_by_name("赵六")
        .unwrap()
        .unwrap();
    assert_eq!(stub.profile, Profile::default());
    let relation = SqliteRelationRepository::new(&conn)
        .relation_between(response.person_id, stub.id)
        .unwrap()
        .unwrap();
    assert_eq!(relation.relation_type, "同事");
    assert_eq!(
        SqliteRelationRepository::new(&conn).list_relations().unwrap().len(),
        2
    );
}

#[test]
fn new_person_with_taken_name_is_conflict_and_writes_nothing() {
    let conn = open_db_in_memory().unwrap();
    SqlitePersonRepository::new(&conn)
        .create_person(&NewPerson::stub("王五"))
        .unwrap();
    let service = ConfirmService::new(&conn, &LengthPreference);

    let err = service
        .confirm(&request(json!({
            "is_new_person": true,
            "profile": {"name": "王五"},
            "relations": [{"name": "赵六", "relation_type": "同事"}]
        })))
        .unwrap_err();

    assert!(matches!(err, ServiceError::Conflict(_)));
    assert!(SqlitePersonRepository::new(&conn)
        .find_person_by_name("赵六")
        .unwrap()
        .is_none());
}

#[test]
fn existing_person_requires_person_id_and_a_stored_target() {
    let conn = open_db_in_memory().unwrap();
    let service = ConfirmService::new(&conn, &LengthPreference);

    let missing_id = service
        .confirm(&request(json!({
            "is_new_person": false,
            "profile": {"name": "王五"}
        })))
        .unwrap_err();
    assert_eq!(missing_id.code(), "invalid_input");

    let unknown = service
        .confirm(&request(json!({
            "is_new_person": false,
            "person_id": 404,
            "profile": {"name": "王五"}
        })))
        .unwrap_err();
    assert!(matches!(unknown, ServiceError::NotFound { id: 404, .. }));
}

#[test]
fn blank_name_is_invalid_input() {
    let conn = open_db_in_memory().unwrap();
    let service = ConfirmService::new(&conn, &LengthPreference);

    let err = service
        .confirm(&request(json!({
            "is_new_person": true,
            "profile": {"name": "  "}
        })))
        .unwrap_err();
    assert_eq!(err.code(), "invalid_input");
}

#[test]
fn keep_existing_resolution_preserves_stored_job() {
    let conn = open_db_in_memory().unwrap();
    let id = SqlitePersonRepository::new(&conn)
        .create_person(&NewPerson {
            name: "张三".into(),
            avatar: None,
            profile: Profile::with_fields(Some("teacher".into()), None),
        })
        .unwrap();
    let service = ConfirmService::new(&conn, &LengthPreference);

    let response = service
        .confirm(&request(json!({
            "is_new_person": false,
            "person_id": id,
            "profile": {"name": "张三", "job": "engineer", "birthday": "1990-01-02"},
            "conflict_resolutions": {"job": "keep_existing"}
        })))
        .unwrap();

    let result = response.result.unwrap();
    assert!(result.profile.job.is_none());
    assert_eq!(result.conflicts.len(), 1);

    let person = SqlitePersonRepository::new(&conn).get_person(id).unwrap().unwrap();
    assert_eq!(person.profile.job.as_deref(), Some("teacher"));
    assert_eq!(person.profile.birthday.as_deref(), Some("1990-01-02"));
}

#[test]
fn merge_replaces_event_and_links_existing_people_by_name() {
    let conn = open_db_in_memory().unwrap();
    let persons = SqlitePersonRepository::new(&conn);
    let id = persons.create_person(&NewPerson::stub("张三")).unwrap();
    let li = persons.create_person(&NewPerson::stub("李四")).unwrap();
    SqliteRecordRepository::new(&conn)
        .insert_event(id, &EventDraft::new("2026-02-20", "吃饭"), Source::Extracted)
        .unwrap();
    let service = ConfirmService::new(&conn, &LengthPreference);

    service
        .confirm(&request(json!({
            "is_new_person": false,
            "person_id": id,
            "profile": {
                "name": "张三",
                "events": [
                    {"date": "2026-02-20", "description": "和李四吃晚饭"},
                    {"date": "2026-02-22", "description": "爬山"}
                ]
            },
            "relations": [{"name": "李四", "relation_type": "朋友"}]
        })))
        .unwrap();

    let detail = PersonService::new(&conn).get_person_detail(id).unwrap();
    let descriptions: Vec<&str> = detail
        .events
        .iter()
        .map(|event| event.description.as_str())
        .collect();
    assert_eq!(descriptions, vec!["和李四吃晚饭", "爬山"]);
    assert!(detail.events.iter().all(|event| event.source == Source::User));
    assert!(SqliteRelationRepository::new(&conn)
        .relation_between(li, id)
        .unwrap()
        .is_some());
    assert_eq!(persons.list_persons().unwrap().len(), 2);
}

#[test]
fn compare_does_not_write() {
    let conn = open_db_in_memory().unwrap();
    let id = SqlitePersonRepository::new(&conn)
        .create_person(&NewPerson::stub("张三"))
        .unwrap();
    let service = ConfirmService::new(&conn, &LengthPreference);
    let payload = request(json!({
        "is_new_person": false,
        "person_id": id,
        "profile": {
            "name": "张三",
            "job": "engineer",
            "events": [{"date": "2026-02-20", "description": "吃饭"}]
        },
        "relations": [{"name": "李四", "relation_type": "朋友"}]
    }))
    .payload();

    let result = service.compare(id, &payload).unwrap();
    assert_eq!(result.new_events.len(), 1);
    assert_eq!(result.profile.job.as_deref(), Some("engineer"));

    let detail = PersonService::new(&conn).get_person_detail(id).unwrap();
    assert!(detail.events.is_empty());
    assert!(detail.person.profile.job.is_none());
    assert!(SqlitePersonRepository::new(&conn)
        .find_person_by_name("李四")
        .unwrap()
        .is_none());
}
