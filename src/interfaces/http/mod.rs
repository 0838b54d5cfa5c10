mod student_view;

use crate::application::{ExportResponsesUseCase, SelectionUseCase, StudentLookupUseCase};
use crate::domain::error::AppError;
use crate::infrastructure::class_list::ClassListClient;
use actix_cors::Cors;
use actix_web::{dev::Server, get, post, web, App, HttpResponse, HttpServer, Responder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use student_view::{render_student, EMAIL_REQUIRED_HTML, NOT_FOUND_HTML, READ_ERROR_HTML};

pub struct HttpState {
    pub export_use_case: Arc<ExportResponsesUseCase>,
    pub lookup_use_case: Arc<StudentLookupUseCase>,
    pub selection_use_case: Arc<SelectionUseCase>,
    pub class_list: Arc<ClassListClient>,
}

#[derive(Deserialize)]
pub struct StudentInfoQuery {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub course_prefix: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[post("/export-responses")]
async fn export_responses(data: web::Data<HttpState>) -> impl Responder {
    info!("Export requested");

    match data.export_use_case.execute().await {
        Ok(report) => {
            info!(
                job_id = %report.job_id,
                file_id = %report.file_id,
                files = report.extracted_files.len(),
                dataset_reloaded = report.dataset_reloaded,
                "Export pipeline finished"
            );
            HttpResponse::Ok().body("Responses downloaded and extracted successfully.")
        }
        Err(AppError::ExportInProgress) => {
            HttpResponse::Conflict().body("An export is already in progress.")
        }
        Err(e) => {
            error!(error = %e, "Error in export process");
            let message = match e {
                AppError::ExportFailed(_) => "Export failed.",
                AppError::ExtractionError(_) => "Error writing file.",
                _ => "Error in export process.",
            };
            HttpResponse::InternalServerError().body(message)
        }
    }
}

#[get("/fetch-class-list")]
async fn fetch_class_list(data: web::Data<HttpState>) -> impl Responder {
    match data.class_list.fetch().await {
        Ok(csv) => HttpResponse::Ok().content_type("text/csv").body(csv),
        Err(e) => {
            error!(error = %e, url = %data.class_list.url(), "Error fetching class list");
            HttpResponse::InternalServerError().body("Error fetching class list")
        }
    }
}

#[get("/student-info")]
async fn student_info(
    data: web::Data<HttpState>,
    query: web::Query<StudentInfoQuery>,
) -> impl Responder {
    let email = match query.email.as_deref().map(str::trim) {
        Some(email) if !email.is_empty() => email.to_string(),
        _ => {
            return HttpResponse::BadRequest()
                .content_type("text/html; charset=utf-8")
                .body(EMAIL_REQUIRED_HTML)
        }
    };

    match data.lookup_use_case.execute(&email).await {
        Ok(Some(student)) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(render_student(&student)),
        Ok(None) => HttpResponse::NotFound()
            .content_type("text/html; charset=utf-8")
            .body(NOT_FOUND_HTML),
        Err(e) if e.is_client_error() => HttpResponse::BadRequest()
            .content_type("text/html; charset=utf-8")
            .body(EMAIL_REQUIRED_HTML),
        Err(e) => {
            error!(error = %e, "Error reading student data");
            HttpResponse::InternalServerError()
                .content_type("text/html; charset=utf-8")
                .body(READ_ERROR_HTML)
        }
    }
}

#[post("/record-selected-student")]
async fn record_selected_student(
    data: web::Data<HttpState>,
    req: web::Json<SelectionRequest>,
) -> impl Responder {
    match data
        .selection_use_case
        .record_selection(&req.email, &req.course_prefix)
        .await
    {
        Ok(_) => HttpResponse::Ok().json(MessageResponse::new("Selection recorded successfully!")),
        Err(e) if e.is_client_error() => {
            warn!(error = %e, "Rejected selection");
            HttpResponse::BadRequest().body(e.to_string())
        }
        Err(e) => {
            error!(error = %e, "Error writing to CSV");
            HttpResponse::InternalServerError().body("Error recording selection")
        }
    }
}

#[post("/unrecord-selected-student")]
async fn unrecord_selected_student(
    data: web::Data<HttpState>,
    req: web::Json<SelectionRequest>,
) -> impl Responder {
    match data
        .selection_use_case
        .unrecord_selection(&req.email, &req.course_prefix)
        .await
    {
        Ok(()) => HttpResponse::Ok().json(MessageResponse::new("Selection unrecorded")),
        Err(e) => {
            error!(error = %e, "Error unrecording selection");
            HttpResponse::InternalServerError().body("Error unrecording selection")
        }
    }
}

/// Registers every route; shared by the server and the handler tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(export_responses)
        .service(fetch_class_list)
        .service(student_info)
        .service(record_selected_student)
        .service(unrecord_selected_student);
}

pub fn start_server(state: HttpState, host: &str, port: u16) -> std::io::Result<Server> {
    let state = web::Data::new(state);

    let server = HttpServer::new(move || {
        let cors = Cors::permissive(); // front end is served from another origin

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((host, port))?
    .run();

    info!("Server running on http://{}:{}", host, port);
    Ok(server)
}
