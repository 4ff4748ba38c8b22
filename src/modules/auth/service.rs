use anyhow::Context;
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use campus_auth::create_access_token;
use campus_auth::policy::{Decision, authorize_registration};
use campus_config::{JwtConfig, PasswordPolicyConfig};
use campus_core::password::rotate_credential;
use campus_core::{AppError, PiiCipher, verify_password};
use campus_models::{
    ChangePasswordRequest, LoginRequest, LoginResponse, RegisterRequest, User, UserDetail,
    UserId, UserRecord,
};

use crate::modules::users::UserService;
use crate::modules::users::service::NewUser;

pub struct AuthService;

impl AuthService {
    /// Creates an account. `actor_id` is the caller when the request carried a
    /// valid token; anonymous callers may only register students.
    #[instrument(skip(db, cipher, policy, dto), fields(role = %dto.role))]
    pub async fn register_user(
        db: &PgPool,
        cipher: &PiiCipher,
        policy: &PasswordPolicyConfig,
        actor_id: Option<UserId>,
        dto: RegisterRequest,
    ) -> Result<User, AppError> {
        let mut tx = db.begin().await.map_err(AppError::database)?;

        let actor = match actor_id {
            Some(id) => Some(UserService::resolve_actor(&mut *tx, id).await?),
            None => None,
        };

        if let Decision::Deny(reason) = authorize_registration(actor.as_ref(), dto.role) {
            warn!(requested_role = %dto.role, reason = %reason, "Registration denied");
            return Err(AppError::forbidden(format!(
                "Only administrators may register a {}",
                dto.role
            )));
        }

        let user = UserService::insert_user(
            &mut *tx,
            cipher,
            policy,
            NewUser {
                name: &dto.name,
                email: &dto.email,
                password: &dto.password,
                role: dto.role,
            },
        )
        .await?;

        tx.commit().await.map_err(AppError::database)?;
        Ok(user)
    }

    /// Wrong email and wrong password are indistinguishable to the caller.
    #[instrument(skip(db, cipher, jwt_config, dto))]
    pub async fn login_user(
        db: &PgPool,
        cipher: &PiiCipher,
        jwt_config: &JwtConfig,
        dto: LoginRequest,
    ) -> Result<LoginResponse, AppError> {
        let record = UserService::find_record_by_email(db, &dto.email)
            .await?
            .ok_or_else(|| AppError::unauthorized("Invalid credentials".to_string()))?;

        let is_valid =
            verify_password(&dto.password, &record.password).map_err(AppError::credential)?;
        if !is_valid {
            return Err(AppError::unauthorized("Invalid credentials".to_string()));
        }

        let access_token = create_access_token(record.id, record.role, jwt_config)?;
        let user = record.decrypt(cipher)?;

        info!(user_id = %user.id, "User logged in");
        Ok(LoginResponse { access_token, user })
    }

    #[instrument(skip(db, cipher))]
    pub async fn get_profile(
        db: &PgPool,
        cipher: &PiiCipher,
        user_id: UserId,
    ) -> Result<UserDetail, AppError> {
        UserService::get_user(db, cipher, user_id, user_id).await
    }

    /// Verifies the old password and stores the new hash. The row stays locked
    /// between the check and the write.
    #[instrument(skip(db, policy, dto))]
    pub async fn change_password(
        db: &PgPool,
        policy: &PasswordPolicyConfig,
        user_id: UserId,
        dto: ChangePasswordRequest,
    ) -> Result<(), AppError> {
        let mut tx = db.begin().await.map_err(AppError::database)?;

        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, name_encrypted, email_encrypted, email_hash, password, role, created_at, updated_at
             FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to fetch user")
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::unauthorized("User no longer exists".to_string()))?;

        let new_hash = rotate_credential(
            &record.password,
            &dto.old_password,
            &dto.new_password,
            policy,
        )
        .map_err(AppError::credential)?;

        sqlx::query("UPDATE users SET password = $1, updated_at = NOW() WHERE id = $2")
            .bind(&new_hash)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .context("Failed to update password")
            .map_err(AppError::database)?;

        tx.commit().await.map_err(AppError::database)?;

        info!(user_id = %user_id, "Password changed");
        Ok(())
    }
}
