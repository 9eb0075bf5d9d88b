use crate::{
    model::{
        ModelManager,
        error::{DatabaseError, DatabaseResult},
    },
    web::{AuthenticatedUser, UserRole},
};

/// Fine-grained actions gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ViewCourse,
    AddCourse,
    EditCourse,
    DeleteCourse,
    AddCategory,
    EditCategory,
    DeleteCategory,
    ManageUsers,
    RateCourse,
    EnrollCourse,
    ReviewEnrollment,
    DeleteEnrollment,
}

pub fn has_permission(role: &UserRole, permission: Permission) -> bool {
    use Permission::*;

    match role {
        UserRole::Admin => !matches!(permission, RateCourse | EnrollCourse),
        UserRole::Moderator => matches!(
            permission,
            ViewCourse | AddCourse | EditCourse | AddCategory | EditCategory | ReviewEnrollment
        ),
        UserRole::Student => matches!(permission, ViewCourse | RateCourse | EnrollCourse),
    }
}

#[async_trait::async_trait]
pub trait HasOwner {
    type OwnerId: PartialEq + Send + Sync;
    async fn get_owner_id(
        &self,
        mm: &ModelManager,
        ctx: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId>;
}

pub async fn check_access<T: HasOwner<OwnerId = O>, O: PartialEq + Send + Sync>(
    mm: &ModelManager,
    ctx: &AuthenticatedUser,
    resource: &T,
    expected: O,
) -> DatabaseResult<()> {
    let actual_owner = resource.get_owner_id(mm, ctx).await?;

    // admin can get all resources
    if ctx.user_role() == UserRole::Admin {
        return Ok(());
    }

    if actual_owner == expected {
        Ok(())
    } else {
        Err(DatabaseError::Forbidden)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use Permission::*;

    const ALL: [Permission; 12] = [
        ViewCourse,
        AddCourse,
        EditCourse,
        DeleteCourse,
        AddCategory,
        EditCategory,
        DeleteCategory,
        ManageUsers,
        RateCourse,
        EnrollCourse,
        ReviewEnrollment,
        DeleteEnrollment,
    ];

    fn granted(role: UserRole) -> Vec<Permission> {
        ALL.into_iter().filter(|p| has_permission(&role, *p)).collect()
    }

    #[test]
    fn admin_has_everything_but_student_actions() {
        assert_eq!(granted(UserRole::Admin).len(), ALL.len() - 2);
        assert!(!has_permission(&UserRole::Admin, RateCourse));
        assert!(!has_permission(&UserRole::Admin, EnrollCourse));
        assert!(has_permission(&UserRole::Admin, DeleteEnrollment));
    }

    #[test]
    fn moderator_cannot_delete_or_manage_users() {
        assert_eq!(
            granted(UserRole::Moderator),
            vec![
                ViewCourse,
                AddCourse,
                EditCourse,
                AddCategory,
                EditCategory,
                ReviewEnrollment
            ]
        );
    }

    #[test]
    fn student_can_only_view_rate_and_enroll() {
        assert_eq!(
            granted(UserRole::Student),
            vec![ViewCourse, RateCourse, EnrollCourse]
        );
    }
}
