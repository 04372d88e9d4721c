//! Route handlers. Each one validates its body, then hands off to a core
//! service on the blocking pool.

use crate::{blocking, with_db, ApiJson, ApiResult, AppState};
use axum::extract::{Path, State};
use axum::Json;
use rapport_core::db::migrations::schema_version;
use rapport_core::llm::extraction::Extractor;
use rapport_core::model::circle::{Circle, CircleDraft, CircleId, CircleWithMembers, Membership};
use rapport_core::model::graph::{GraphLayout, GraphView};
use rapport_core::model::person::{PersonDetail, PersonId, PersonUpdate};
use rapport_core::model::record::{AnnotationId, DevelopmentId, EventId};
use rapport_core::model::relation::{Relation, RelationDraft};
use rapport_core::service::circle_service::CircleService;
use rapport_core::service::confirm_service::{ConfirmRequest, ConfirmResponse, ConfirmService};
use rapport_core::service::extract_service::ExtractService;
use rapport_core::service::graph_service::GraphService;
use rapport_core::service::person_service::{NameCheck, PersonService, RelationOutcome};
use rapport_core::{core_version, DetailResolver, ExtractionPayload, ReconcileResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckNameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub person_id: PersonId,
    pub extracted_data: ExtractionPayload,
}

#[derive(Debug, Deserialize)]
pub struct LayoutRequest {
    pub layout_json: Value,
}

#[derive(Debug, Deserialize)]
pub struct MemberRequest {
    pub person_id: PersonId,
}

/// Acknowledgement for writes that return no entity.
#[derive(Debug, Serialize)]
pub struct Ack {
    pub success: bool,
    pub message: &'static str,
}

impl Ack {
    fn ok(message: &'static str) -> Json<Self> {
        Json(Self {
            success: true,
            message,
        })
    }
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Rapport relationship API",
        "version": core_version(),
    }))
}

pub async fn healthz(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let llm_configured = !state.extract_chain().is_empty();
    let version = with_db(&state, |conn, _| Ok(schema_version(conn)?)).await?;
    Ok(Json(json!({
        "status": "ok",
        "schema_version": version,
        "llm_configured": llm_configured,
    })))
}

pub async fn extract(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ExtractRequest>,
) -> ApiResult<Json<ExtractionPayload>> {
    let chain = state.extract_chain().clone();
    blocking(move || ExtractService::new(Extractor::new(chain)).extract(&request.text))
        .await
        .map(Json)
}

pub async fn check_name(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CheckNameRequest>,
) -> ApiResult<Json<NameCheck>> {
    with_db(&state, move |conn, _| {
        PersonService::new(conn).check_name(&request.name)
    })
    .await
    .map(Json)
}

pub async fn compare(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CompareRequest>,
) -> ApiResult<Json<ReconcileResult>> {
    with_db(&state, move |conn, state| {
        let resolver = DetailResolver::new(state.compare_chain().clone());
        ConfirmService::new(conn, &resolver).compare(request.person_id, &request.extracted_data)
    })
    .await
    .map(Json)
}

pub async fn confirm(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ConfirmRequest>,
) -> ApiResult<Json<ConfirmResponse>> {
    with_db(&state, move |conn, state| {
        let resolver = DetailResolver::new(state.compare_chain().clone());
        ConfirmService::new(conn, &resolver).confirm(&request)
    })
    .await
    .map(Json)
}

pub async fn list_persons(State(state): State<AppState>) -> ApiResult<Json<Vec<PersonDetail>>> {
    with_db(&state, |conn, _| PersonService::new(conn).list_person_details())
        .await
        .map(Json)
}

pub async fn get_person(
    State(state): State<AppState>,
    Path(id): Path<PersonId>,
) -> ApiResult<Json<PersonDetail>> {
    with_db(&state, move |conn, _| {
        PersonService::new(conn).get_person_detail(id)
    })
    .await
    .map(Json)
}

pub async fn update_person(
    State(state): State<AppState>,
    Path(id): Path<PersonId>,
    ApiJson(update): ApiJson<PersonUpdate>,
) -> ApiResult<Json<PersonDetail>> {
    with_db(&state, move |conn, _| {
        PersonService::new(conn).update_person(id, &update)
    })
    .await
    .map(Json)
}

pub async fn delete_person(
    State(state): State<AppState>,
    Path(id): Path<PersonId>,
) -> ApiResult<Json<Ack>> {
    with_db(&state, move |conn, _| PersonService::new(conn).delete_person(id)).await?;
    Ok(Ack::ok("person deleted"))
}

pub async fn delete_event(
    State(state): State<AppState>,
    Path((id, event_id)): Path<(PersonId, EventId)>,
) -> ApiResult<Json<Ack>> {
    with_db(&state, move |conn, _| {
        PersonService::new(conn).delete_event(id, event_id)
    })
    .await?;
    Ok(Ack::ok("event deleted"))
}

pub async fn delete_annotation(
    State(state): State<AppState>,
    Path((id, annotation_id)): Path<(PersonId, AnnotationId)>,
) -> ApiResult<Json<Ack>> {
    with_db(&state, move |conn, _| {
        PersonService::new(conn).delete_annotation(id, annotation_id)
    })
    .await?;
    Ok(Ack::ok("annotation deleted"))
}

pub async fn delete_development(
    State(state): State<AppState>,
    Path((id, development_id)): Path<(PersonId, DevelopmentId)>,
) -> ApiResult<Json<Ack>> {
    with_db(&state, move |conn, _| {
        PersonService::new(conn).delete_development(id, development_id)
    })
    .await?;
    Ok(Ack::ok("development deleted"))
}

pub async fn list_relations(
    State(state): State<AppState>,
    Path(id): Path<PersonId>,
) -> ApiResult<Json<Vec<Relation>>> {
    with_db(&state, move |conn, _| PersonService::new(conn).list_relations(id))
        .await
        .map(Json)
}

pub async fn create_relation(
    State(state): State<AppState>,
    Path(id): Path<PersonId>,
    ApiJson(draft): ApiJson<RelationDraft>,
) -> ApiResult<Json<RelationOutcome>> {
    with_db(&state, move |conn, _| {
        PersonService::new(conn).create_relation(id, &draft)
    })
    .await
    .map(Json)
}

pub async fn delete_relation(
    State(state): State<AppState>,
    Path((id, other_id)): Path<(PersonId, PersonId)>,
) -> ApiResult<Json<Ack>> {
    with_db(&state, move |conn, _| {
        PersonService::new(conn).delete_relation(id, other_id)
    })
    .await?;
    Ok(Ack::ok("relation deleted"))
}

pub async fn person_circles(
    State(state): State<AppState>,
    Path(id): Path<PersonId>,
) -> ApiResult<Json<Vec<Circle>>> {
    with_db(&state, move |conn, _| {
        PersonService::new(conn).circles_for_person(id)
    })
    .await
    .map(Json)
}

pub async fn graph(State(state): State<AppState>) -> ApiResult<Json<GraphView>> {
    with_db(&state, |conn, _| GraphService::new(conn).graph_view())
        .await
        .map(Json)
}

pub async fn load_layout(State(state): State<AppState>) -> ApiResult<Json<GraphLayout>> {
    with_db(&state, |conn, _| GraphService::new(conn).load_layout())
        .await
        .map(Json)
}

pub async fn save_layout(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LayoutRequest>,
) -> ApiResult<Json<Value>> {
    let saved = with_db(&state, move |conn, _| {
        GraphService::new(conn).save_layout(&request.layout_json)
    })
    .await?;
    Ok(Json(json!({
        "success": true,
        "message": "layout saved",
        "updated_at": saved.updated_at,
    })))
}

pub async fn list_circles(State(state): State<AppState>) -> ApiResult<Json<Vec<Circle>>> {
    with_db(&state, |conn, _| CircleService::new(conn).list_circles())
        .await
        .map(Json)
}

pub async fn create_circle(
    State(state): State<AppState>,
    ApiJson(draft): ApiJson<CircleDraft>,
) -> ApiResult<Json<Circle>> {
    with_db(&state, move |conn, _| {
        CircleService::new(conn).create_circle(&draft)
    })
    .await
    .map(Json)
}

pub async fn circles_with_members(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<CircleWithMembers>>> {
    with_db(&state, |conn, _| CircleService::new(conn).circles_with_members())
        .await
        .map(Json)
}

pub async fn delete_circle(
    State(state): State<AppState>,
    Path(id): Path<CircleId>,
) -> ApiResult<Json<Ack>> {
    with_db(&state, move |conn, _| CircleService::new(conn).delete_circle(id)).await?;
    Ok(Ack::ok("circle deleted"))
}

pub async fn add_member(
    State(state): State<AppState>,
    Path(id): Path<CircleId>,
    ApiJson(request): ApiJson<MemberRequest>,
) -> ApiResult<Json<Membership>> {
    with_db(&state, move |conn, _| {
        CircleService::new(conn).add_member(id, request.person_id)
    })
    .await
    .map(Json)
}

pub async fn remove_member(
    State(state): State<AppState>,
    Path((id, person_id)): Path<(CircleId, PersonId)>,
) -> ApiResult<Json<Ack>> {
    with_db(&state, move |conn, _| {
        CircleService::new(conn).remove_member(id, person_id)
    })
    .await?;
    Ok(Ack::ok("member removed"))
}
