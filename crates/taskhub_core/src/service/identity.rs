//! Identity gateway: local accounts, social login, profile pictures.
//!
//! # Responsibility
//! - Register and authenticate local password accounts.
//! - Provision users from verified external identity claims.
//! - Swap profile pictures without leaving dangling references.
//!
//! # Invariants
//! - Login failures are indistinguishable to the caller.
//! - One user row per external subject, enforced by the store upsert.
//! - A user never references an image that was not stored successfully.

use crate::model::entity::{EntityId, EntityRef};
use crate::model::user::{Credentials, RegisterUser, User, UserDraft, VerifiedClaims};
use crate::model::validation::ValidationErrors;
use crate::repo::user_repo::UserRepository;
use crate::service::external::{
    CollaboratorError, IdentityTokenVerifier, ImageFormat, ImageStorage, ImageUpload,
};
use crate::service::password::{
    hash_password, placeholder_hash, verify_against_dummy, verify_password,
};
use crate::service::{ServiceError, ServiceResult};
use log::{info, warn};
use uuid::Uuid;

const VERIFIER: &str = "identity_token_verifier";
const STORAGE: &str = "image_storage";

/// Verifies an external token, mapping collaborator failures to the
/// service taxonomy.
///
/// Exposed separately so callers can run the remote call without holding
/// any store resources.
pub fn verify_external_token(
    verifier: &dyn IdentityTokenVerifier,
    token: &str,
) -> ServiceResult<VerifiedClaims> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ServiceError::Unauthorized);
    }
    match verifier.verify(token) {
        Ok(claims) if !claims.subject.trim().is_empty() && !claims.email.trim().is_empty() => {
            Ok(claims)
        }
        Ok(_) => {
            warn!("event=external_login module=identity status=denied reason=incomplete_claims");
            Err(ServiceError::Unauthorized)
        }
        Err(CollaboratorError::Rejected(reason)) => {
            info!("event=external_login module=identity status=denied reason={reason}");
            Err(ServiceError::Unauthorized)
        }
        Err(err) => Err(ServiceError::upstream(VERIFIER)(err)),
    }
}

/// Account and authentication facade.
pub struct IdentityGateway<'a, R: UserRepository> {
    repo: R,
    verifier: &'a dyn IdentityTokenVerifier,
    storage: &'a dyn ImageStorage,
}

impl<'a, R: UserRepository> IdentityGateway<'a, R> {
    pub fn new(
        repo: R,
        verifier: &'a dyn IdentityTokenVerifier,
        storage: &'a dyn ImageStorage,
    ) -> Self {
        Self {
            repo,
            verifier,
            storage,
        }
    }

    pub fn list_users(&self) -> ServiceResult<Vec<User>> {
        Ok(self.repo.list_users()?)
    }

    pub fn get_user(&self, user_id: EntityId) -> ServiceResult<User> {
        self.repo
            .get_user(user_id)?
            .ok_or(ServiceError::NotFound(EntityRef::user(user_id)))
    }

    /// Self-service registration with an optional profile picture.
    pub fn register(
        &self,
        input: &RegisterUser,
        picture: Option<&ImageUpload>,
    ) -> ServiceResult<User> {
        let mut errors = ValidationErrors::new();
        let draft = self.validate_account(input, true, &mut errors)?;
        let format = match picture.map(ImageUpload::validate).transpose() {
            Ok(format) => format,
            Err(picture_errors) => {
                errors.merge(picture_errors);
                None
            }
        };
        errors.into_result()?;
        let Some(draft) = draft else {
            return Err(ServiceError::Internal(
                "account validation yielded no draft".to_string(),
            ));
        };

        let password_hash = draft.password.as_deref().map(hash_password).transpose()?;
        let reference = match (picture, format) {
            (Some(upload), Some(format)) => Some(self.store_image(upload, format)?),
            _ => None,
        };

        let user = self.insert_account(draft, password_hash, reference.clone());
        if user.is_err() {
            if let Some(reference) = reference.as_deref() {
                self.discard_image(reference);
            }
        }
        let user = user?;
        info!(
            "event=register module=identity status=ok user_id={}",
            user.id
        );
        Ok(user)
    }

    /// Administrative account creation; the password is optional.
    pub fn create_user(&self, input: &RegisterUser) -> ServiceResult<User> {
        let mut errors = ValidationErrors::new();
        let draft = self.validate_account(input, false, &mut errors)?;
        errors.into_result()?;
        let Some(draft) = draft else {
            return Err(ServiceError::Internal(
                "account validation yielded no draft".to_string(),
            ));
        };
        let password_hash = draft.password.as_deref().map(hash_password).transpose()?;
        let user = self.insert_account(draft, password_hash, None)?;
        info!(
            "event=user_create module=identity status=ok user_id={}",
            user.id
        );
        Ok(user)
    }

    /// Local password login.
    pub fn login(&self, credentials: &Credentials) -> ServiceResult<User> {
        let (email, password) = credentials.validate()?;
        let user = self.repo.find_user_by_email(&email)?;

        let hash = user.as_ref().and_then(|user| user.password_hash.as_deref());
        let accepted = match hash {
            Some(hash) => verify_password(&password, hash),
            None => {
                verify_against_dummy(&password);
                false
            }
        };

        match user {
            Some(user) if accepted => {
                info!("event=login module=identity status=ok user_id={}", user.id);
                Ok(user)
            }
            _ => {
                info!("event=login module=identity status=denied");
                Err(ServiceError::Unauthorized)
            }
        }
    }

    /// Social login: verify the token, then provision the user.
    pub fn login_with_external_token(&self, token: &str) -> ServiceResult<User> {
        let claims = verify_external_token(self.verifier, token)?;
        self.provision_external_user(&claims)
    }

    /// Find-or-create by external subject, refreshing profile fields.
    ///
    /// A replaced picture reference is discarded after the upsert commits.
    pub fn provision_external_user(&self, claims: &VerifiedClaims) -> ServiceResult<User> {
        let placeholder = placeholder_hash()?;
        let (user, previous) = self.repo.upsert_external_user(claims, &placeholder)?;
        if let Some(previous) =
            previous.filter(|previous| user.profile_picture.as_ref() != Some(previous))
        {
            self.discard_image(&previous);
        }
        info!(
            "event=external_login module=identity status=ok user_id={}",
            user.id
        );
        Ok(user)
    }

    /// Replaces the profile picture: store new, commit, then drop old.
    pub fn update_profile_picture(
        &self,
        user_id: EntityId,
        upload: &ImageUpload,
    ) -> ServiceResult<User> {
        let format = upload.validate()?;
        self.get_user(user_id)?;

        let reference = self.store_image(upload, format)?;
        let previous = match self.repo.replace_profile_picture(user_id, Some(&reference)) {
            Ok(previous) => previous,
            Err(err) => {
                self.discard_image(&reference);
                return Err(err.into());
            }
        };
        if let Some(previous) = previous.filter(|previous| previous != &reference) {
            self.discard_image(&previous);
        }

        info!(
            "event=profile_picture_update module=identity status=ok user_id={user_id}"
        );
        self.get_user(user_id)
    }

    /// Deletes the account and its subtree, then its stored picture.
    pub fn delete_user(&self, user_id: EntityId) -> ServiceResult<()> {
        let user = self.get_user(user_id)?;
        self.repo.delete_user(user_id)?;
        if let Some(reference) = user.profile_picture.as_deref() {
            self.discard_image(reference);
        }
        info!("event=user_delete module=identity status=ok user_id={user_id}");
        Ok(())
    }

    /// Field validation plus the email uniqueness check.
    ///
    /// Failures are collected into `errors`; only store errors return early.
    fn validate_account(
        &self,
        input: &RegisterUser,
        password_required: bool,
        errors: &mut ValidationErrors,
    ) -> ServiceResult<Option<UserDraft>> {
        match input.validate(password_required) {
            Ok(draft) => {
                if self.repo.find_user_by_email(&draft.email)?.is_some() {
                    errors.add("email", "The email has already been taken.");
                }
                Ok(Some(draft))
            }
            Err(field_errors) => {
                errors.merge(field_errors);
                Ok(None)
            }
        }
    }

    fn insert_account(
        &self,
        draft: UserDraft,
        password_hash: Option<String>,
        profile_picture: Option<String>,
    ) -> ServiceResult<User> {
        let id = Uuid::new_v4();
        self.repo.create_user(&User {
            id,
            name: draft.name,
            email: draft.email,
            password_hash,
            external_id: None,
            profile_picture,
            created_at: 0,
            updated_at: 0,
        })?;
        self.get_user(id)
    }

    fn store_image(&self, upload: &ImageUpload, format: ImageFormat) -> ServiceResult<String> {
        self.storage
            .store(&upload.bytes, format)
            .map_err(ServiceError::upstream(STORAGE))
    }

    fn discard_image(&self, reference: &str) {
        if let Err(err) = self.storage.delete(reference) {
            warn!(
                "event=image_delete module=identity status=error reference={reference} error={err}"
            );
        }
    }
}
