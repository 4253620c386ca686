//! Server-level permission evaluation.
//!
//! Revolt sends permissions as 64-bit masks. A member's effective server
//! permissions start from the server's `default_permissions`, then each of
//! the member's roles is applied from lowest to highest priority as
//! `(current | allow) & !deny`. The server owner holds every permission.

use serde::{Deserialize, Serialize};

use crate::types::{Member, Server};

/// Named permission bits a bot is likely to gate commands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    ManageChannel,
    ManageServer,
    ManagePermissions,
    ManageRole,
    ManageCustomisation,
    KickMembers,
    BanMembers,
    TimeoutMembers,
    AssignRoles,
    ManageNicknames,
    ViewChannel,
    ReadMessageHistory,
    SendMessage,
    ManageMessages,
    ManageWebhooks,
    SendEmbeds,
}

impl Permission {
    pub const fn bit(self) -> u64 {
        match self {
            Self::ManageChannel => 1 << 0,
            Self::ManageServer => 1 << 1,
            Self::ManagePermissions => 1 << 2,
            Self::ManageRole => 1 << 3,
            Self::ManageCustomisation => 1 << 4,
            Self::KickMembers => 1 << 6,
            Self::BanMembers => 1 << 7,
            Self::TimeoutMembers => 1 << 8,
            Self::AssignRoles => 1 << 9,
            Self::ManageNicknames => 1 << 11,
            Self::ViewChannel => 1 << 20,
            Self::ReadMessageHistory => 1 << 21,
            Self::SendMessage => 1 << 22,
            Self::ManageMessages => 1 << 23,
            Self::ManageWebhooks => 1 << 24,
            Self::SendEmbeds => 1 << 26,
        }
    }
}

/// Effective server-level permission mask for `member` in `server`.
pub fn server_permissions(server: &Server, member: &Member) -> u64 {
    if member.id.user == server.owner {
        return u64::MAX;
    }

    let mut roles: Vec<_> = member
        .roles
        .iter()
        .filter_map(|id| server.roles.get(id))
        .collect();
    // Highest rank number is lowest priority, so it goes first.
    roles.sort_by(|a, b| b.rank.cmp(&a.rank));

    roles.iter().fold(server.default_permissions, |perms, role| {
        (perms | role.permissions.a) & !role.permissions.d
    })
}

pub fn has_permission(server: &Server, member: &Member, permission: Permission) -> bool {
    server_permissions(server, member) & permission.bit() != 0
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::types::{user::MemberCompositeKey, OverrideField, Role};

    fn server(roles: Vec<(&str, i64, u64, u64)>) -> Server {
        Server {
            id: "srv".into(),
            owner: "owner".into(),
            name: "Spooky".into(),
            default_permissions: Permission::SendMessage.bit(),
            roles: roles
                .into_iter()
                .map(|(id, rank, a, d)| {
                    (
                        id.to_string(),
                        Role {
                            name: id.to_string(),
                            permissions: OverrideField { a, d },
                            rank,
                        },
                    )
                })
                .collect::<HashMap<_, _>>(),
        }
    }

    fn member(user: &str, roles: &[&str]) -> Member {
        Member {
            id: MemberCompositeKey {
                server: "srv".into(),
                user: user.into(),
            },
            joined_at: None,
            nickname: None,
            roles: roles.iter().map(|r| r.to_string()).collect(),
            timeout: None,
        }
    }

    #[test]
    fn owner_has_everything() {
        let s = server(vec![]);
        assert!(has_permission(&s, &member("owner", &[]), Permission::ManageMessages));
    }

    #[test]
    fn plain_member_gets_defaults_only() {
        let s = server(vec![]);
        let m = member("someone", &[]);
        assert!(has_permission(&s, &m, Permission::SendMessage));
        assert!(!has_permission(&s, &m, Permission::ManageMessages));
    }

    #[test]
    fn higher_priority_role_wins() {
        let manage = Permission::ManageMessages.bit();
        // "mod" grants, "muzzled" (higher priority, lower rank) denies.
        let s = server(vec![("mod", 5, manage, 0), ("muzzled", 1, 0, manage)]);
        assert!(!has_permission(&s, &member("u", &["mod", "muzzled"]), Permission::ManageMessages));
        assert!(has_permission(&s, &member("u", &["mod"]), Permission::ManageMessages));
    }

    #[test]
    fn unknown_roles_are_ignored() {
        let s = server(vec![]);
        assert!(!has_permission(&s, &member("u", &["ghost"]), Permission::ManageMessages));
    }
}
