use actix_web::{get, post, web, HttpRequest, HttpResponse};
use async_graphql::http::{playground_source, GraphQLPlaygroundConfig};
use async_graphql_actix_web::{GraphQLRequest, GraphQLResponse};
use log::{debug, info};
use uuid::Uuid;

use super::super::context::RequestContext;
use super::super::models::Role;
use super::AppState;

// Header carrying the caller's role, e.g. `X-Role: ADMIN`
pub const ROLE_HEADER: &str = "x-role";

// Handles POST /query requests for executing GraphQL queries
#[post("/query")]
pub async fn graphql(state: web::Data<AppState>, http: HttpRequest, request: GraphQLRequest) -> GraphQLResponse {
    let request_id = Uuid::new_v4();
    let role = Role::from_name(http.headers().get(ROLE_HEADER).and_then(|v| v.to_str().ok()));
    info!("Request {} executing as {:?}", request_id, role);

    // Fresh loaders for this request only; dropped with the request
    let context = RequestContext::new(state.store.clone(), role, state.loader_config);
    let response = state.schema.execute(request.into_inner().data(context)).await;

    if response.is_err() {
        debug!("Request {} finished with {} errors", request_id, response.errors.len());
    }
    response.into()
}

// Handles GET / requests to serve the GraphQL playground, configured to query the /query endpoint
#[get("/")]
pub async fn playground() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(playground_source(GraphQLPlaygroundConfig::new("/query")))
}

// Registers the GraphQL, playground and metrics endpoints
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(graphql)
        .service(playground)
        .route("/metrics", web::get().to(super::super::metrics::metrics));
}
