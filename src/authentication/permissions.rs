use crate::{jwt::SessionData, schema::UserRole};

const USER_ACTIONS: &[ActionType] = &[
    ActionType::ManageOwnFavorites,
    ActionType::ManageOwnCart,
    ActionType::ManageOwnFollows,
    ActionType::CreateRecipes,
    ActionType::ManageOwnRecipes,
];

// Roles are advisory: a fresh account is a guest and may still do everything
// a regular user does.
const ACTION_TABLE: &[(UserRole, &[ActionType])] = &[
    (UserRole::Guest, USER_ACTIONS),
    (UserRole::Authorized, USER_ACTIONS),
    (
        UserRole::Admin,
        &[
            ActionType::ManageOwnFavorites,
            ActionType::ManageOwnCart,
            ActionType::ManageOwnFollows,
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageAllRecipes,
            ActionType::ManageTags,
            ActionType::ManageIngredients,
        ],
    ),
];

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionType {
    CreateRecipes,

    ManageOwnFavorites,
    ManageOwnCart,
    ManageOwnFollows,
    ManageOwnRecipes,

    ManageAllRecipes,
    ManageTags,
    ManageIngredients,
}

impl ActionType {
    pub fn authenticate(self, session: &SessionData) -> bool {
        if session.is_admin {
            return true;
        }
        if session.is_staff && self == ActionType::ManageAllRecipes {
            return true;
        }

        ACTION_TABLE
            .iter()
            .find_map(|(role, actions)| {
                if session.role != *role {
                    return None;
                }

                Some(actions.contains(&self))
            })
            .unwrap_or(false)
    }
}
