use actix_web::{get, post, web, HttpResponse};
use log::{error, info};
use sqlx::SqlitePool;

use crate::ai::{self, TextGenerator, IDEA_FALLBACK, MVP_FALLBACK};
use crate::auth::{hash_password, verify_login, IdentityClaim, SessionAuthenticator};
use crate::db;
use crate::errors::ApiError;
use crate::extractor::AuthenticatedUser;
use crate::models::{
    AuthResponse, Credentials, GeneratedIdea, GeneratedMvp, IdeaRequest, IdeaResponse,
    MvpRequest, MvpResponse, ProjectList, UserResponse,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        ApiError::BadRequest(err.to_string()).into()
    }))
    .service(
        web::scope("/api/auth")
            .service(signup_user)
            .service(login_user),
    )
    .service(web::scope("/api/projects").service(list_projects))
    .service(
        web::scope("/api/ai")
            .service(generate_idea)
            .service(generate_mvp),
    );
}

fn auth_response(
    authenticator: &SessionAuthenticator,
    user_id: i64,
    email: String,
) -> Result<AuthResponse, ApiError> {
    let identity = IdentityClaim { user_id, email };
    let token = authenticator.issue_token(&identity)?;
    Ok(AuthResponse {
        token,
        user: UserResponse {
            id: identity.user_id,
            email: identity.email,
        },
    })
}

#[post("/signup")]
async fn signup_user(
    credentials: web::Json<Credentials>,
    pool: web::Data<SqlitePool>,
    authenticator: web::Data<SessionAuthenticator>,
) -> Result<HttpResponse, ApiError> {
    credentials.validate()?;

    let hashed_password = hash_password(&credentials.password)?;
    let email = credentials.normalized_email();

    let user = db::create_user(pool.get_ref(), &email, &hashed_password)
        .await?
        .ok_or_else(|| ApiError::Conflict("User already exists".into()))?;

    info!("Registered user {}", user.id);
    let response = auth_response(&authenticator, user.id, user.email)?;
    Ok(HttpResponse::Created().json(response))
}

#[post("/login")]
async fn login_user(
    credentials: web::Json<Credentials>,
    pool: web::Data<SqlitePool>,
    authenticator: web::Data<SessionAuthenticator>,
) -> Result<HttpResponse, ApiError> {
    let email = credentials.normalized_email();

    // Unknown email and wrong password produce the same answer in the same time
    let user = db::find_user_by_email(pool.get_ref(), &email).await?;
    let stored_hash = user.as_ref().map(|user| user.hashed_password.as_str());
    if !verify_login(stored_hash, &credentials.password)? {
        return Err(ApiError::InvalidCredentials);
    }
    let user = user.ok_or(ApiError::InvalidCredentials)?;

    let response = auth_response(&authenticator, user.id, user.email)?;
    Ok(HttpResponse::Ok().json(response))
}

#[get("")]
async fn list_projects(
    user: AuthenticatedUser,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, ApiError> {
    let projects = db::list_projects(pool.get_ref(), user.0.user_id).await?;
    Ok(HttpResponse::Ok().json(ProjectList { projects }))
}

#[post("/idea")]
async fn generate_idea(
    user: AuthenticatedUser,
    req: web::Json<IdeaRequest>,
    pool: web::Data<SqlitePool>,
    generator: web::Data<dyn TextGenerator>,
) -> Result<HttpResponse, ApiError> {
    let topic = req.validated_topic()?;

    let idea_text = generator
        .complete(ai::idea_request(topic))
        .await
        .map_err(|err| {
            error!("AI idea generation error: {:#}", err);
            ApiError::AiUnavailable
        })?;
    let idea_text = ai::or_fallback(idea_text, IDEA_FALLBACK);

    let project = db::create_project(
        pool.get_ref(),
        user.0.user_id,
        &format!("AI Generated: {}", topic),
        &format!("Startup idea generated for: {}", topic),
        &idea_text,
    )
    .await?;

    Ok(HttpResponse::Created().json(IdeaResponse {
        message: "Idea generated successfully",
        project: GeneratedIdea {
            id: project.id,
            title: project.title,
            idea: project.idea,
            created_at: project.created_at,
        },
    }))
}

#[post("/mvp")]
async fn generate_mvp(
    user: AuthenticatedUser,
    req: web::Json<MvpRequest>,
    pool: web::Data<SqlitePool>,
    generator: web::Data<dyn TextGenerator>,
) -> Result<HttpResponse, ApiError> {
    let user_id = user.0.user_id;

    let project = db::find_project(pool.get_ref(), user_id, req.project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found or unauthorized".into()))?;

    let idea = project
        .idea
        .as_deref()
        .filter(|idea| !idea.is_empty())
        .ok_or_else(|| {
            ApiError::BadRequest("Project must have an idea to generate MVP plan".into())
        })?;

    let mvp_plan = generator
        .complete(ai::mvp_request(idea))
        .await
        .map_err(|err| {
            error!("AI MVP plan generation error: {:#}", err);
            ApiError::AiUnavailable
        })?;
    let mvp_plan = ai::or_fallback(mvp_plan, MVP_FALLBACK);

    let updated = db::set_mvp_plan(pool.get_ref(), user_id, project.id, &mvp_plan)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found or unauthorized".into()))?;

    Ok(HttpResponse::Ok().json(MvpResponse {
        message: "MVP plan generated successfully",
        project: GeneratedMvp {
            id: updated.id,
            title: updated.title,
            idea: updated.idea,
            mvp_plan: updated.mvp_plan,
            updated_at: updated.updated_at,
        },
    }))
}
