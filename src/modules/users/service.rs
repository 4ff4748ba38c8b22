//! User management and the identity model.
//!
//! Names and emails are encrypted with the state's [`PiiCipher`]; every
//! email lookup goes through `email_hash`, never through the ciphertext.

use anyhow::Context;
use sqlx::{PgConnection, PgExecutor, PgPool};
use tracing::{debug, info, instrument};

use campus_auth::policy::{ActionKind, Actor, ResourceRef, enforce};
use campus_config::PasswordPolicyConfig;
use campus_core::password::{check_password_policy, hash_password};
use campus_core::{
    AppError, PaginationMeta, PaginationParams, PiiCipher, email_lookup_key, normalize_email,
};
use campus_models::{
    CourseId, CreateUserDto, PaginatedUsersResponse, Role, UpdateUserDto, User, UserDetail,
    UserId, UserRecord,
};

const USER_COLUMNS: &str =
    "id, name_encrypted, email_encrypted, email_hash, password, role, created_at, updated_at";

/// Plaintext identity of an account about to be created.
#[derive(Debug, Clone, Copy)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub role: Role,
}

fn map_email_conflict(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e
        && db_err.is_unique_violation()
    {
        return AppError::conflict(anyhow::anyhow!("Email already in use"));
    }
    AppError::database(anyhow::Error::new(e).context("Failed to write user"))
}

fn decrypt_all(records: &[UserRecord], cipher: &PiiCipher) -> Result<Vec<User>, AppError> {
    records
        .iter()
        .map(|record| record.decrypt(cipher))
        .collect::<anyhow::Result<Vec<_>>>()
        .map_err(AppError::internal)
}

pub struct UserService;

impl UserService {
    /// Loads the caller's current role. A token whose user has since been
    /// deleted no longer identifies anyone.
    pub async fn resolve_actor<'e, E>(executor: E, user_id: UserId) -> Result<Actor, AppError>
    where
        E: PgExecutor<'e>,
    {
        let role = sqlx::query_scalar::<_, Role>("SELECT role FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(executor)
            .await
            .context("Failed to resolve caller")
            .map_err(AppError::database)?
            .ok_or_else(|| AppError::unauthorized("User no longer exists".to_string()))?;

        Ok(Actor::new(user_id, role))
    }

    pub async fn find_record_by_id<'e, E>(
        executor: E,
        user_id: UserId,
    ) -> Result<Option<UserRecord>, AppError>
    where
        E: PgExecutor<'e>,
    {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(executor)
        .await
        .context("Failed to fetch user")
        .map_err(AppError::database)?;

        Ok(record)
    }

    /// Exact-match lookup through the email hash.
    pub async fn find_record_by_email<'e, E>(
        executor: E,
        email: &str,
    ) -> Result<Option<UserRecord>, AppError>
    where
        E: PgExecutor<'e>,
    {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email_hash = $1"
        ))
        .bind(email_lookup_key(email))
        .fetch_optional(executor)
        .await
        .context("Failed to fetch user by email")
        .map_err(AppError::database)?;

        Ok(record)
    }

    pub async fn find_by_id<'e, E>(
        executor: E,
        cipher: &PiiCipher,
        user_id: UserId,
    ) -> Result<Option<User>, AppError>
    where
        E: PgExecutor<'e>,
    {
        Self::find_record_by_id(executor, user_id)
            .await?
            .map(|record| record.decrypt(cipher))
            .transpose()
            .map_err(AppError::internal)
    }

    pub async fn find_by_email<'e, E>(
        executor: E,
        cipher: &PiiCipher,
        email: &str,
    ) -> Result<Option<User>, AppError>
    where
        E: PgExecutor<'e>,
    {
        Self::find_record_by_email(executor, email)
            .await?
            .map(|record| record.decrypt(cipher))
            .transpose()
            .map_err(AppError::internal)
    }

    /// Validates, hashes, encrypts and inserts a new account. A duplicate
    /// email (after normalization) is a 409.
    pub async fn insert_user(
        conn: &mut PgConnection,
        cipher: &PiiCipher,
        policy: &PasswordPolicyConfig,
        new_user: NewUser<'_>,
    ) -> Result<User, AppError> {
        let name = new_user.name.trim();
        if name.is_empty() {
            return Err(AppError::bad_request(anyhow::anyhow!("Name is required")));
        }
        check_password_policy(new_user.password, policy).map_err(AppError::credential)?;

        let email = normalize_email(new_user.email);
        let password_hash = hash_password(new_user.password).map_err(AppError::credential)?;

        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (id, name_encrypted, email_encrypted, email_hash, password, role)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(UserId::new())
        .bind(cipher.encrypt(name)?)
        .bind(cipher.encrypt(&email)?)
        .bind(email_lookup_key(&email))
        .bind(&password_hash)
        .bind(new_user.role)
        .fetch_one(&mut *conn)
        .await
        .map_err(map_email_conflict)?;

        info!(user_id = %record.id, role = %record.role, "User created");
        Ok(record.decrypt(cipher)?)
    }

    async fn with_courses<'e, E>(executor: E, user: User) -> Result<UserDetail, AppError>
    where
        E: PgExecutor<'e>,
    {
        let (courses_teaching, courses_enrolled) = match user.role {
            Role::Professor => {
                let ids = sqlx::query_scalar::<_, CourseId>(
                    "SELECT id FROM courses WHERE professor_id = $1 ORDER BY created_at",
                )
                .bind(user.id)
                .fetch_all(executor)
                .await
                .context("Failed to fetch taught courses")
                .map_err(AppError::database)?;
                (Some(ids), None)
            }
            Role::Student => {
                let ids = sqlx::query_scalar::<_, CourseId>(
                    "SELECT course_id FROM enrollments WHERE student_id = $1 ORDER BY enrolled_at",
                )
                .bind(user.id)
                .fetch_all(executor)
                .await
                .context("Failed to fetch enrollments")
                .map_err(AppError::database)?;
                (None, Some(ids))
            }
            Role::Administrator => (None, None),
        };

        Ok(UserDetail {
            user,
            courses_teaching,
            courses_enrolled,
        })
    }

    #[instrument(skip(db, cipher))]
    pub async fn list_users(
        db: &PgPool,
        cipher: &PiiCipher,
        actor_id: UserId,
        params: PaginationParams,
    ) -> Result<PaginatedUsersResponse, AppError> {
        let actor = Self::resolve_actor(db, actor_id).await?;
        enforce(&actor, ActionKind::ListUsers, &ResourceRef::None)?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(db)
            .await
            .context("Failed to count users")
            .map_err(AppError::database)?;

        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id LIMIT $1 OFFSET $2"
        ))
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(db)
        .await
        .context("Failed to fetch users")
        .map_err(AppError::database)?;

        Ok(PaginatedUsersResponse {
            data: decrypt_all(&records, cipher)?,
            meta: PaginationMeta::from_params(&params, total),
        })
    }

    #[instrument(skip(db, cipher))]
    pub async fn get_user(
        db: &PgPool,
        cipher: &PiiCipher,
        actor_id: UserId,
        user_id: UserId,
    ) -> Result<UserDetail, AppError> {
        let actor = Self::resolve_actor(db, actor_id).await?;

        let user = Self::find_by_id(db, cipher, user_id)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("User not found")))?;

        enforce(
            &actor,
            ActionKind::ReadUser,
            &ResourceRef::User {
                id: user.id,
                role: user.role,
            },
        )?;

        Self::with_courses(db, user).await
    }

    /// Decrypts every user and filters in memory, since ciphertext cannot be
    /// searched by substring. Cost grows linearly with the user table.
    // TODO: replace the full scan with a blind index of name/email trigrams.
    #[instrument(skip(db, cipher, query))]
    pub async fn search_users(
        db: &PgPool,
        cipher: &PiiCipher,
        actor_id: UserId,
        query: &str,
    ) -> Result<Vec<User>, AppError> {
        let actor = Self::resolve_actor(db, actor_id).await?;
        enforce(&actor, ActionKind::SearchUsers, &ResourceRef::None)?;

        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id"
        ))
        .fetch_all(db)
        .await
        .context("Failed to fetch users")
        .map_err(AppError::database)?;

        let scanned = records.len();
        let matched: Vec<User> = decrypt_all(&records, cipher)?
            .into_iter()
            .filter(|user| user.matches(query))
            .collect();

        debug!(scanned, matched = matched.len(), "User search decrypted full table");
        Ok(matched)
    }

    /// Administrator-only account creation. Administrators themselves are
    /// created through registration or the CLI.
    #[instrument(skip(db, cipher, policy, dto), fields(role = %dto.role))]
    pub async fn create_user(
        db: &PgPool,
        cipher: &PiiCipher,
        policy: &PasswordPolicyConfig,
        actor_id: UserId,
        dto: CreateUserDto,
    ) -> Result<User, AppError> {
        let mut tx = db.begin().await.map_err(AppError::database)?;

        let actor = Self::resolve_actor(&mut *tx, actor_id).await?;
        enforce(&actor, ActionKind::CreateUser, &ResourceRef::None)?;

        if !matches!(dto.role, Role::Student | Role::Professor) {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Role must be Student or Professor"
            )));
        }

        let user = Self::insert_user(
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

    /// Changes name, email or password. The target row is locked for the
    /// whole check-then-write sequence.
    #[instrument(skip(db, cipher, policy, dto))]
    pub async fn update_user(
        db: &PgPool,
        cipher: &PiiCipher,
        policy: &PasswordPolicyConfig,
        actor_id: UserId,
        user_id: UserId,
        dto: UpdateUserDto,
    ) -> Result<User, AppError> {
        let mut tx = db.begin().await.map_err(AppError::database)?;

        let actor = Self::resolve_actor(&mut *tx, actor_id).await?;

        let current = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE"
        ))
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to fetch user")
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("User not found")))?;

        enforce(
            &actor,
            ActionKind::UpdateUser,
            &ResourceRef::User {
                id: current.id,
                role: current.role,
            },
        )?;

        let name_encrypted = match dto.name.as_deref().map(str::trim) {
            Some("") => {
                return Err(AppError::bad_request(anyhow::anyhow!("Name cannot be empty")));
            }
            Some(name) => cipher.encrypt(name)?,
            None => current.name_encrypted.clone(),
        };

        let (email_encrypted, email_hash) = match dto.email.as_deref() {
            Some(email) => {
                let email = normalize_email(email);
                (cipher.encrypt(&email)?, email_lookup_key(&email))
            }
            None => (current.email_encrypted.clone(), current.email_hash.clone()),
        };

        let password = match dto.password.as_deref() {
            Some(password) => {
                check_password_policy(password, policy).map_err(AppError::credential)?;
                hash_password(password).map_err(AppError::credential)?
            }
            None => current.password.clone(),
        };

        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "UPDATE users
             SET name_encrypted = $2, email_encrypted = $3, email_hash = $4, password = $5,
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&name_encrypted)
        .bind(&email_encrypted)
        .bind(&email_hash)
        .bind(&password)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_email_conflict)?;

        tx.commit().await.map_err(AppError::database)?;

        info!(user_id = %user_id, "User updated");
        Ok(record.decrypt(cipher)?)
    }

    #[instrument(skip(db))]
    pub async fn delete_user(
        db: &PgPool,
        actor_id: UserId,
        user_id: UserId,
    ) -> Result<(), AppError> {
        let mut tx = db.begin().await.map_err(AppError::database)?;

        let actor = Self::resolve_actor(&mut *tx, actor_id).await?;
        enforce(&actor, ActionKind::DeleteUser, &ResourceRef::None)?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e
                    && db_err.is_foreign_key_violation()
                {
                    return AppError::conflict(anyhow::anyhow!(
                        "User still owns courses; reassign or delete them first"
                    ));
                }
                AppError::database(anyhow::Error::new(e).context("Failed to delete user"))
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!("User not found")));
        }

        tx.commit().await.map_err(AppError::database)?;

        info!(user_id = %user_id, "User deleted");
        Ok(())
    }
}
