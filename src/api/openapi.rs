//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the media-dl REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the media-dl REST API
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "media-dl REST API",
        version = "0.1.0",
        description = "REST API for orchestrating media downloads: URL inspection, job submission, progress polling, and artifact retrieval",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:5000", description = "Local development server")
    ),
    paths(
        // Media
        crate::api::routes::media_info,
        crate::api::routes::start_download,
        crate::api::routes::get_progress,
        crate::api::routes::get_file,
        crate::api::routes::list_downloads,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        crate::api::routes::InfoRequest,
        crate::api::routes::InfoResponse,
        crate::api::routes::StartDownloadRequest,
        crate::api::routes::StartDownloadResponse,
        crate::api::routes::DownloadedFile,
        crate::types::Job,
        crate::types::Status,
        crate::types::QualityOption,
        crate::error::ApiError,
        crate::error::ErrorDetail,
        crate::error::EngineErrorKind,
    )),
    tags(
        (name = "media", description = "Media inspection and download jobs"),
        (name = "system", description = "Health and documentation")
    )
)]
pub struct ApiDoc;
