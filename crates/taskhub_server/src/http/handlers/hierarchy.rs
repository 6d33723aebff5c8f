//! Group, project, task and attachment endpoints.
//!
//! Path segments arrive as text and are parsed into typed ownership paths;
//! a segment that is not an id answers 404 for its kind.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use taskhub_core::model::hierarchy::{AttachmentInput, NameInput, TaskInput};
use taskhub_core::service::ownership::{AttachmentPath, GroupPath, ProjectPath, TaskPath};
use taskhub_core::EntityKind;

use crate::http::error::{parse_id, ApiError};
use crate::http::resources::{
    collect, AttachmentResource, Data, Deleted, NamedResource, TaskResource,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct GroupParams {
    user_id: String,
    group_id: String,
}

impl GroupParams {
    fn parse(&self) -> Result<GroupPath, ApiError> {
        group_path(&self.user_id, &self.group_id)
    }
}

#[derive(Debug, Deserialize)]
pub struct ProjectParams {
    user_id: String,
    group_id: String,
    project_id: String,
}

impl ProjectParams {
    fn parse(&self) -> Result<ProjectPath, ApiError> {
        let group = group_path(&self.user_id, &self.group_id)?;
        Ok(group.project(parse_id(EntityKind::Project, &self.project_id)?))
    }
}

#[derive(Debug, Deserialize)]
pub struct TaskParams {
    user_id: String,
    group_id: String,
    project_id: String,
    task_id: String,
}

impl TaskParams {
    fn parse(&self) -> Result<TaskPath, ApiError> {
        task_path(&self.user_id, &self.group_id, &self.project_id, &self.task_id)
    }
}

#[derive(Debug, Deserialize)]
pub struct AttachmentParams {
    user_id: String,
    group_id: String,
    project_id: String,
    task_id: String,
    attachment_id: String,
}

impl AttachmentParams {
    fn parse(&self) -> Result<AttachmentPath, ApiError> {
        let task = task_path(&self.user_id, &self.group_id, &self.project_id, &self.task_id)?;
        Ok(task.attachment(parse_id(EntityKind::Attachment, &self.attachment_id)?))
    }
}

fn group_path(user_id: &str, group_id: &str) -> Result<GroupPath, ApiError> {
    Ok(GroupPath {
        user_id: parse_id(EntityKind::User, user_id)?,
        group_id: parse_id(EntityKind::Group, group_id)?,
    })
}

fn task_path(
    user_id: &str,
    group_id: &str,
    project_id: &str,
    task_id: &str,
) -> Result<TaskPath, ApiError> {
    Ok(group_path(user_id, group_id)?
        .project(parse_id(EntityKind::Project, project_id)?)
        .task(parse_id(EntityKind::Task, task_id)?))
}

pub async fn list_user_projects(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Data<Vec<NamedResource>>>, ApiError> {
    let user_id = parse_id(EntityKind::User, &user_id)?;
    let projects = state
        .resources(move |service| service.list_projects_for_user(user_id))
        .await?;
    Ok(Json(Data::new(collect(projects))))
}

pub async fn list_groups(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Data<Vec<NamedResource>>>, ApiError> {
    let user_id = parse_id(EntityKind::User, &user_id)?;
    let groups = state
        .resources(move |service| service.list_groups(user_id))
        .await?;
    Ok(Json(Data::new(collect(groups))))
}

pub async fn create_group(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    payload: Result<Json<NameInput>, JsonRejection>,
) -> Result<Json<Data<NamedResource>>, ApiError> {
    let user_id = parse_id(EntityKind::User, &user_id)?;
    let Json(input) = payload?;
    let group = state
        .resources(move |service| service.create_group(user_id, &input))
        .await?;
    Ok(Json(Data::new(group.into())))
}

pub async fn update_group(
    State(state): State<AppState>,
    Path(params): Path<GroupParams>,
    payload: Result<Json<NameInput>, JsonRejection>,
) -> Result<Json<Data<NamedResource>>, ApiError> {
    let path = params.parse()?;
    let Json(input) = payload?;
    let group = state
        .resources(move |service| service.update_group(path, &input))
        .await?;
    Ok(Json(Data::new(group.into())))
}

pub async fn delete_group(
    State(state): State<AppState>,
    Path(params): Path<GroupParams>,
) -> Result<Json<Deleted>, ApiError> {
    let path = params.parse()?;
    state
        .resources(move |service| service.delete_group(path))
        .await?;
    Ok(Json(Deleted::of(EntityKind::Group)))
}

pub async fn list_projects(
    State(state): State<AppState>,
    Path(params): Path<GroupParams>,
) -> Result<Json<Data<Vec<NamedResource>>>, ApiError> {
    let group = params.parse()?;
    let projects = state
        .resources(move |service| service.list_projects(group))
        .await?;
    Ok(Json(Data::new(collect(projects))))
}

pub async fn create_project(
    State(state): State<AppState>,
    Path(params): Path<GroupParams>,
    payload: Result<Json<NameInput>, JsonRejection>,
) -> Result<Json<Data<NamedResource>>, ApiError> {
    let group = params.parse()?;
    let Json(input) = payload?;
    let project = state
        .resources(move |service| service.create_project(group, &input))
        .await?;
    Ok(Json(Data::new(project.into())))
}

pub async fn update_project(
    State(state): State<AppState>,
    Path(params): Path<ProjectParams>,
    payload: Result<Json<NameInput>, JsonRejection>,
) -> Result<Json<Data<NamedResource>>, ApiError> {
    let path = params.parse()?;
    let Json(input) = payload?;
    let project = state
        .resources(move |service| service.update_project(path, &input))
        .await?;
    Ok(Json(Data::new(project.into())))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Path(params): Path<ProjectParams>,
) -> Result<Json<Deleted>, ApiError> {
    let path = params.parse()?;
    state
        .resources(move |service| service.delete_project(path))
        .await?;
    Ok(Json(Deleted::of(EntityKind::Project)))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Path(params): Path<ProjectParams>,
) -> Result<Json<Data<Vec<TaskResource>>>, ApiError> {
    let project = params.parse()?;
    let tasks = state
        .resources(move |service| service.list_tasks(project))
        .await?;
    Ok(Json(Data::new(collect(tasks))))
}

pub async fn create_task(
    State(state): State<AppState>,
    Path(params): Path<ProjectParams>,
    payload: Result<Json<TaskInput>, JsonRejection>,
) -> Result<Json<Data<TaskResource>>, ApiError> {
    let project = params.parse()?;
    let Json(input) = payload?;
    let task = state
        .resources(move |service| service.create_task(project, input))
        .await?;
    Ok(Json(Data::new(task.into())))
}

pub async fn update_task(
    State(state): State<AppState>,
    Path(params): Path<TaskParams>,
    payload: Result<Json<TaskInput>, JsonRejection>,
) -> Result<Json<Data<TaskResource>>, ApiError> {
    let path = params.parse()?;
    let Json(input) = payload?;
    let task = state
        .resources(move |service| service.update_task(path, &input))
        .await?;
    Ok(Json(Data::new(task.into())))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(params): Path<TaskParams>,
) -> Result<Json<Deleted>, ApiError> {
    let path = params.parse()?;
    state
        .resources(move |service| service.delete_task(path))
        .await?;
    Ok(Json(Deleted::of(EntityKind::Task)))
}

pub async fn list_attachments(
    State(state): State<AppState>,
    Path(params): Path<TaskParams>,
) -> Result<Json<Data<Vec<AttachmentResource>>>, ApiError> {
    let task = params.parse()?;
    let attachments = state
        .resources(move |service| service.list_attachments(task))
        .await?;
    Ok(Json(Data::new(collect(attachments))))
}

pub async fn create_attachment(
    State(state): State<AppState>,
    Path(params): Path<TaskParams>,
    payload: Result<Json<AttachmentInput>, JsonRejection>,
) -> Result<Json<Data<AttachmentResource>>, ApiError> {
    let task = params.parse()?;
    let Json(input) = payload?;
    let attachment = state
        .resources(move |service| service.create_attachment(task, input))
        .await?;
    Ok(Json(Data::new(attachment.into())))
}

pub async fn delete_attachment(
    State(state): State<AppState>,
    Path(params): Path<AttachmentParams>,
) -> Result<Json<Deleted>, ApiError> {
    let path = params.parse()?;
    state
        .resources(move |service| service.delete_attachment(path))
        .await?;
    Ok(Json(Deleted::of(EntityKind::Attachment)))
}
