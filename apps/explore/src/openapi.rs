use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Explore API",
        version = "0.1.0",
        description = "Language-partner matching: profiles, embeddings and suggestions"
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    )
)]
pub struct ApiDoc;

/// Service info merged with the explore routes
pub fn document() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.merge(domain_explore::ApiDoc::openapi());
    doc
}
