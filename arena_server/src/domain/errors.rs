// Domain-level errors for world mutations.

use super::state::AvatarId;

#[derive(Debug, Clone, PartialEq)]
pub enum WorldError {
    DuplicateAvatar(AvatarId),
}
