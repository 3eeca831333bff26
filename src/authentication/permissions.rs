use crate::{jwt::SessionData, schema::UserRole};

const ACTION_TABLE: &[(UserRole, &[ActionType])] = &[
    (
        UserRole::User,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnLists,
            ActionType::ManageOwnSubscriptions,
        ],
    ),
    (
        UserRole::Admin,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnLists,
            ActionType::ManageOwnSubscriptions,
            ActionType::ManageAllRecipes,
            ActionType::ManageUsers,
        ],
    ),
];

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionType {
    CreateRecipes,

    ManageOwnRecipes,
    ManageOwnLists,
    ManageOwnSubscriptions,

    ManageAllRecipes,
    ManageUsers,
}

impl ActionType {
    pub fn permitted(self, session: &SessionData) -> bool {
        ACTION_TABLE
            .iter()
            .find_map(|(role, actions)| (session.role == *role).then(|| actions.contains(&self)))
            .unwrap_or(false)
    }
}

/// Capability predicate for recipe mutation: the author, or an admin.
pub fn can_modify_recipe(session: &SessionData, author_id: i32) -> bool {
    session.is_admin || session.user_id == author_id
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: UserRole) -> SessionData {
        SessionData {
            user_id: 10,
            username: "ada".to_string(),
            is_admin: role == UserRole::Admin,
            role,
        }
    }

    #[test]
    fn plain_users_cannot_manage_all_recipes() {
        let session = session(UserRole::User);
        assert!(ActionType::ManageOwnRecipes.permitted(&session));
        assert!(!ActionType::ManageAllRecipes.permitted(&session));
        assert!(!ActionType::ManageUsers.permitted(&session));
    }

    #[test]
    fn admins_hold_every_action() {
        let session = session(UserRole::Admin);
        assert!(ActionType::CreateRecipes.permitted(&session));
        assert!(ActionType::ManageAllRecipes.permitted(&session));
        assert!(ActionType::ManageUsers.permitted(&session));
    }

    #[test]
    fn author_or_admin_may_modify() {
        assert!(can_modify_recipe(&session(UserRole::User), 10));
        assert!(!can_modify_recipe(&session(UserRole::User), 11));
        assert!(can_modify_recipe(&session(UserRole::Admin), 11));
    }
}
