use crate::domain::UserId;

// ============== Authorization ==============

/// Only the configured owner may drive the bot.
pub fn is_operator(user_id: Option<UserId>, owner_id: i64) -> bool {
    let Some(user_id) = user_id else {
        return false;
    };
    user_id.0 == owner_id
}
