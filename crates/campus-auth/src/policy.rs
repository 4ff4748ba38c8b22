//! Access policy engine.
//!
//! [`authorize`] is the single place that decides whether an [`Actor`] may
//! perform an [`ActionKind`] on a [`ResourceRef`]. It performs no I/O: the
//! caller resolves ownership facts (a course's professor, a grade's student)
//! beforehand and passes them in, which keeps every rule testable in
//! isolation.
//!
//! Rules, by role:
//!
//! | Action | Student | Professor | Administrator |
//! |---|---|---|---|
//! | ListUsers, SearchUsers, CreateUser, DeleteUser | deny | deny | allow |
//! | ReadUser | self | allow | allow |
//! | UpdateUser | self | self | allow |
//! | ReadCourse | allow | allow | allow |
//! | CreateCourse | deny | allow | allow |
//! | UpdateCourse | deny | owner | allow |
//! | DeleteCourse | deny | deny | allow |
//! | ListCourseStudents | deny | allow | allow |
//! | JoinCourse, LeaveCourse | self | deny | deny |
//! | AssignGrade, UpdateGrade, ListGrades | deny | allow | allow |
//! | DeleteGrade | deny | deny | allow |
//! | ReadGrade | owner | allow | allow |
//! | ListStudentGrades | self | allow | allow |
//!
//! Anything not listed is denied.

use std::fmt;

use campus_core::AppError;
use campus_models::{Role, UserId};

/// The authenticated principal a request acts on behalf of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    CreateUser,
    ReadUser,
    UpdateUser,
    DeleteUser,
    ListUsers,
    SearchUsers,
    CreateCourse,
    ReadCourse,
    UpdateCourse,
    DeleteCourse,
    JoinCourse,
    LeaveCourse,
    ListCourseStudents,
    AssignGrade,
    ReadGrade,
    UpdateGrade,
    DeleteGrade,
    ListGrades,
    ListStudentGrades,
}

impl ActionKind {
    pub const ALL: [ActionKind; 19] = [
        ActionKind::CreateUser,
        ActionKind::ReadUser,
        ActionKind::UpdateUser,
        ActionKind::DeleteUser,
        ActionKind::ListUsers,
        ActionKind::SearchUsers,
        ActionKind::CreateCourse,
        ActionKind::ReadCourse,
        ActionKind::UpdateCourse,
        ActionKind::DeleteCourse,
        ActionKind::JoinCourse,
        ActionKind::LeaveCourse,
        ActionKind::ListCourseStudents,
        ActionKind::AssignGrade,
        ActionKind::ReadGrade,
        ActionKind::UpdateGrade,
        ActionKind::DeleteGrade,
        ActionKind::ListGrades,
        ActionKind::ListStudentGrades,
    ];
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The resource an action targets, reduced to the facts the rules need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceRef {
    /// Collection-level actions (list, search, create).
    None,
    User { id: UserId, role: Role },
    Course { professor_id: UserId },
    /// The student a join or leave would enroll or unenroll.
    Enrollment { student_id: UserId },
    Grade { student_id: UserId },
    /// All grades of one student.
    StudentRecord { student_id: UserId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    RoleNotPermitted,
    NotOwner,
    NotSelf,
    /// The resource shape does not fit the action.
    UnsupportedResource,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DenyReason::RoleNotPermitted => "role not permitted",
            DenyReason::NotOwner => "not the owner of the resource",
            DenyReason::NotSelf => "may only act on own account",
            DenyReason::UnsupportedResource => "unsupported resource",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

fn role_in(actor: &Actor, allowed: &[Role]) -> Decision {
    if allowed.contains(&actor.role) {
        Decision::Allow
    } else {
        Decision::Deny(DenyReason::RoleNotPermitted)
    }
}

fn same_user(actor: &Actor, target: UserId, reason: DenyReason) -> Decision {
    if actor.id == target {
        Decision::Allow
    } else {
        Decision::Deny(reason)
    }
}

pub fn authorize(actor: &Actor, action: ActionKind, resource: &ResourceRef) -> Decision {
    use ActionKind::*;
    use Role::{Administrator, Professor, Student};

    const ADMIN: &[Role] = &[Administrator];
    const STAFF: &[Role] = &[Professor, Administrator];
    const EVERYONE: &[Role] = &[Student, Professor, Administrator];

    match action {
        ListUsers | SearchUsers | CreateUser | DeleteUser | DeleteCourse | DeleteGrade => {
            role_in(actor, ADMIN)
        }
        CreateCourse | ListCourseStudents | AssignGrade | UpdateGrade | ListGrades => {
            role_in(actor, STAFF)
        }
        ReadCourse => role_in(actor, EVERYONE),

        ReadUser => match (actor.role, resource) {
            (Administrator | Professor, ResourceRef::User { .. }) => Decision::Allow,
            (Student, ResourceRef::User { id, .. }) => same_user(actor, *id, DenyReason::NotSelf),
            _ => Decision::Deny(DenyReason::UnsupportedResource),
        },
        UpdateUser => match (actor.role, resource) {
            (Administrator, ResourceRef::User { .. }) => Decision::Allow,
            (_, ResourceRef::User { id, .. }) => same_user(actor, *id, DenyReason::NotSelf),
            _ => Decision::Deny(DenyReason::UnsupportedResource),
        },
        UpdateCourse => match (actor.role, resource) {
            (Administrator, ResourceRef::Course { .. }) => Decision::Allow,
            (Professor, ResourceRef::Course { professor_id }) => {
                same_user(actor, *professor_id, DenyReason::NotOwner)
            }
            (Student, ResourceRef::Course { .. }) => Decision::Deny(DenyReason::RoleNotPermitted),
            _ => Decision::Deny(DenyReason::UnsupportedResource),
        },
        JoinCourse | LeaveCourse => match (actor.role, resource) {
            (Student, ResourceRef::Enrollment { student_id }) => {
                same_user(actor, *student_id, DenyReason::NotSelf)
            }
            (_, ResourceRef::Enrollment { .. }) => Decision::Deny(DenyReason::RoleNotPermitted),
            _ => Decision::Deny(DenyReason::UnsupportedResource),
        },
        ReadGrade => match (actor.role, resource) {
            (Administrator | Professor, ResourceRef::Grade { .. }) => Decision::Allow,
            (Student, ResourceRef::Grade { student_id }) => {
                same_user(actor, *student_id, DenyReason::NotOwner)
            }
            _ => Decision::Deny(DenyReason::UnsupportedResource),
        },
        ListStudentGrades => match (actor.role, resource) {
            (Administrator | Professor, ResourceRef::StudentRecord { .. }) => Decision::Allow,
            (Student, ResourceRef::StudentRecord { student_id }) => {
                same_user(actor, *student_id, DenyReason::NotSelf)
            }
            _ => Decision::Deny(DenyReason::UnsupportedResource),
        },
    }
}

/// Who may create an account with `requested` role.
///
/// Anyone, signed in or not, may register a student. Professors and
/// administrators can only be registered by an administrator.
pub fn authorize_registration(actor: Option<&Actor>, requested: Role) -> Decision {
    match (requested, actor) {
        (Role::Student, _) => Decision::Allow,
        (_, Some(actor)) if actor.role == Role::Administrator => Decision::Allow,
        _ => Decision::Deny(DenyReason::RoleNotPermitted),
    }
}

/// Runs [`authorize`] and turns a denial into a 403, logging it for audit.
pub fn enforce(actor: &Actor, action: ActionKind, resource: &ResourceRef) -> Result<(), AppError> {
    match authorize(actor, action, resource) {
        Decision::Allow => Ok(()),
        Decision::Deny(reason) => {
            tracing::warn!(
                actor_id = %actor.id,
                actor_role = %actor.role,
                action = %action,
                reason = %reason,
                "Authorization denied"
            );
            Err(AppError::forbidden(format!(
                "Permission denied for {action}: {reason}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ActionKind::*;
    use axum::http::StatusCode;

    #[derive(Debug, Clone, Copy)]
    enum Rule {
        Allow,
        Deny,
        /// Allowed only when the actor owns the resource or is its subject.
        Own,
    }

    /// (action, student, professor, administrator)
    const TABLE: [(ActionKind, Rule, Rule, Rule); 19] = [
        (ListUsers, Rule::Deny, Rule::Deny, Rule::Allow),
        (SearchUsers, Rule::Deny, Rule::Deny, Rule::Allow),
        (ReadUser, Rule::Own, Rule::Allow, Rule::Allow),
        (CreateUser, Rule::Deny, Rule::Deny, Rule::Allow),
        (UpdateUser, Rule::Own, Rule::Own, Rule::Allow),
        (DeleteUser, Rule::Deny, Rule::Deny, Rule::Allow),
        (CreateCourse, Rule::Deny, Rule::Allow, Rule::Allow),
        (ReadCourse, Rule::Allow, Rule::Allow, Rule::Allow),
        (UpdateCourse, Rule::Deny, Rule::Own, Rule::Allow),
        (DeleteCourse, Rule::Deny, Rule::Deny, Rule::Allow),
        (ListCourseStudents, Rule::Deny, Rule::Allow, Rule::Allow),
        (JoinCourse, Rule::Own, Rule::Deny, Rule::Deny),
        (LeaveCourse, Rule::Own, Rule::Deny, Rule::Deny),
        (AssignGrade, Rule::Deny, Rule::Allow, Rule::Allow),
        (UpdateGrade, Rule::Deny, Rule::Allow, Rule::Allow),
        (DeleteGrade, Rule::Deny, Rule::Deny, Rule::Allow),
        (ReadGrade, Rule::Own, Rule::Allow, Rule::Allow),
        (ListGrades, Rule::Deny, Rule::Allow, Rule::Allow),
        (ListStudentGrades, Rule::Own, Rule::Allow, Rule::Allow),
    ];

    /// Builds the resource an action would normally be checked against, owned
    /// by `owner`.
    fn resource_for(action: ActionKind, owner: UserId) -> ResourceRef {
        match action {
            ReadUser | UpdateUser | DeleteUser => ResourceRef::User {
                id: owner,
                role: Role::Student,
            },
            UpdateCourse | DeleteCourse | ListCourseStudents | ReadCourse => {
                ResourceRef::Course {
                    professor_id: owner,
                }
            }
            JoinCourse | LeaveCourse => ResourceRef::Enrollment { student_id: owner },
            ReadGrade | UpdateGrade | DeleteGrade => ResourceRef::Grade { student_id: owner },
            ListStudentGrades => ResourceRef::StudentRecord { student_id: owner },
            ListUsers | SearchUsers | CreateUser | CreateCourse | AssignGrade | ListGrades => {
                ResourceRef::None
            }
        }
    }

    fn expected(rule: Rule, owns: bool) -> bool {
        match rule {
            Rule::Allow => true,
            Rule::Deny => false,
            Rule::Own => owns,
        }
    }

    #[test]
    fn test_table_covers_every_action() {
        for action in ActionKind::ALL {
            assert!(
                TABLE.iter().any(|(a, ..)| *a == action),
                "{action} missing from table"
            );
        }
    }

    #[test]
    fn test_every_role_action_ownership_combination() {
        for (action, student, professor, admin) in TABLE {
            for (role, rule) in [
                (Role::Student, student),
                (Role::Professor, professor),
                (Role::Administrator, admin),
            ] {
                for owns in [true, false] {
                    let actor = Actor::new(UserId::new(), role);
                    let owner = if owns { actor.id } else { UserId::new() };
                    let decision = authorize(&actor, action, &resource_for(action, owner));
                    assert_eq!(
                        decision.is_allowed(),
                        expected(rule, owns),
                        "{role} {action} owns={owns}: got {decision:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_deny_reasons() {
        let student = Actor::new(UserId::new(), Role::Student);
        let professor = Actor::new(UserId::new(), Role::Professor);
        let other = UserId::new();

        assert_eq!(
            authorize(&student, DeleteCourse, &ResourceRef::None),
            Decision::Deny(DenyReason::RoleNotPermitted)
        );
        assert_eq!(
            authorize(
                &professor,
                UpdateCourse,
                &ResourceRef::Course {
                    professor_id: other
                }
            ),
            Decision::Deny(DenyReason::NotOwner)
        );
        assert_eq!(
            authorize(
                &student,
                ReadUser,
                &ResourceRef::User {
                    id: other,
                    role: Role::Student
                }
            ),
            Decision::Deny(DenyReason::NotSelf)
        );
        assert_eq!(
            authorize(&student, ReadGrade, &ResourceRef::Grade { student_id: other }),
            Decision::Deny(DenyReason::NotOwner)
        );
        assert_eq!(
            authorize(
                &professor,
                JoinCourse,
                &ResourceRef::Enrollment {
                    student_id: professor.id
                }
            ),
            Decision::Deny(DenyReason::RoleNotPermitted)
        );
    }

    #[test]
    fn test_mismatched_resource_is_denied() {
        let admin = Actor::new(UserId::new(), Role::Administrator);
        assert_eq!(
            authorize(&admin, UpdateCourse, &ResourceRef::None),
            Decision::Deny(DenyReason::UnsupportedResource)
        );
        assert_eq!(
            authorize(
                &admin,
                ReadGrade,
                &ResourceRef::Course {
                    professor_id: admin.id
                }
            ),
            Decision::Deny(DenyReason::UnsupportedResource)
        );
    }

    #[test]
    fn test_professor_reads_any_user_role() {
        let professor = Actor::new(UserId::new(), Role::Professor);
        for role in Role::ALL {
            let target = ResourceRef::User {
                id: UserId::new(),
                role,
            };
            assert!(authorize(&professor, ReadUser, &target).is_allowed());
        }
    }

    #[test]
    fn test_registration_rules() {
        let admin = Actor::new(UserId::new(), Role::Administrator);
        let professor = Actor::new(UserId::new(), Role::Professor);
        let student = Actor::new(UserId::new(), Role::Student);

        assert!(authorize_registration(None, Role::Student).is_allowed());
        assert!(!authorize_registration(None, Role::Professor).is_allowed());
        assert!(!authorize_registration(None, Role::Administrator).is_allowed());

        assert!(authorize_registration(Some(&student), Role::Student).is_allowed());
        assert!(!authorize_registration(Some(&professor), Role::Professor).is_allowed());
        assert!(!authorize_registration(Some(&student), Role::Administrator).is_allowed());

        for role in Role::ALL {
            assert!(authorize_registration(Some(&admin), role).is_allowed());
        }
    }

    #[test]
    fn test_enforce_maps_deny_to_forbidden() {
        let student = Actor::new(UserId::new(), Role::Student);
        let err = enforce(&student, CreateCourse, &ResourceRef::None).unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert!(err.error.to_string().contains("CreateCourse"));

        let admin = Actor::new(UserId::new(), Role::Administrator);
        assert!(enforce(&admin, CreateCourse, &ResourceRef::None).is_ok());
    }
}
