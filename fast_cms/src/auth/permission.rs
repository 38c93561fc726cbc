//! Cross-user authorization rule.
//!
//! Every endpoint where one user mutates something owned by another user
//! (profile edits, avatars, posts) goes through [`authorize_mutation`].

use super::{
    errors::{AuthError, AuthResult},
    models::{Power, User, UserId},
};
use crate::db::UserRepository;

/// Outcome of the rank comparison, before the target row is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Actor and owner are the same account.
    SelfService,
    /// Actor is an admin; the owner's rank still has to be compared.
    NeedsTarget,
    /// Actor is not an admin.
    Denied,
}

/// First stage of the rule: only the actor is needed.
pub fn precheck(actor_id: UserId, actor_power: Power, target_id: UserId) -> Decision {
    if actor_id == target_id {
        Decision::SelfService
    } else if !actor_power.is_admin() {
        Decision::Denied
    } else {
        Decision::NeedsTarget
    }
}

/// Full rule evaluated against known ranks.
///
/// `target_power` is `None` when the owner does not exist.
pub fn permits(
    actor_id: UserId,
    actor_power: Power,
    target_id: UserId,
    target_power: Option<Power>,
) -> AuthResult<()> {
    match precheck(actor_id, actor_power, target_id) {
        Decision::SelfService => Ok(()),
        Decision::Denied => Err(AuthError::PermissionDenied),
        Decision::NeedsTarget => {
            let target_power = target_power.ok_or(AuthError::UserNotFound)?;
            if actor_power.outranks(target_power) {
                Ok(())
            } else {
                Err(AuthError::PermissionDenied)
            }
        }
    }
}

/// Check that `actor` may mutate resources owned by `target_id`.
///
/// The target row is only loaded when the actor is an admin acting on someone
/// else. Returns the loaded target, if any.
pub async fn authorize_mutation(
    users: &dyn UserRepository,
    actor: &User,
    target_id: UserId,
) -> AuthResult<Option<User>> {
    match precheck(actor.id, actor.power, target_id) {
        Decision::SelfService => Ok(None),
        Decision::Denied => {
            log::warn!(
                "user {} ({}) denied mutation of user {}",
                actor.id,
                actor.power,
                target_id
            );
            Err(AuthError::PermissionDenied)
        }
        Decision::NeedsTarget => {
            let target = users.find_by_id(target_id).await?;
            permits(
                actor.id,
                actor.power,
                target_id,
                target.as_ref().map(|t| t.power),
            )
            .inspect_err(|e| {
                if matches!(e, AuthError::PermissionDenied) {
                    log::warn!(
                        "user {} ({}) denied mutation of peer or superior {}",
                        actor.id,
                        actor.power,
                        target_id
                    );
                }
            })?;
            Ok(target)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn power_strategy() -> impl Strategy<Value = Power> {
        prop_oneof![
            Just(Power::Banned),
            Just(Power::Normal),
            Just(Power::Admin),
            Just(Power::SuperAdmin),
        ]
    }

    #[test]
    fn test_normal_user_cannot_touch_others() {
        assert!(matches!(
            permits(5, Power::Normal, 6, Some(Power::Normal)),
            Err(AuthError::PermissionDenied)
        ));
    }

    #[test]
    fn test_admin_cannot_touch_peer_admin() {
        assert!(matches!(
            permits(2, Power::Admin, 3, Some(Power::Admin)),
            Err(AuthError::PermissionDenied)
        ));
    }

    #[test]
    fn test_admin_can_touch_normal_user() {
        assert!(permits(2, Power::Admin, 6, Some(Power::Normal)).is_ok());
    }

    #[test]
    fn test_missing_target_is_not_found_for_admins_only() {
        assert!(matches!(
            permits(2, Power::Admin, 99, None),
            Err(AuthError::UserNotFound)
        ));
        assert!(matches!(
            permits(5, Power::Normal, 99, None),
            Err(AuthError::PermissionDenied)
        ));
    }

    #[test]
    fn test_self_service_always_allowed() {
        assert!(permits(4, Power::Banned, 4, None).is_ok());
        assert_eq!(precheck(4, Power::Normal, 4), Decision::SelfService);
    }

    proptest! {
        #[test]
        fn prop_gate_matches_rank_rule(
            actor_id in 1i64..20,
            target_id in 1i64..20,
            actor_power in power_strategy(),
            target_power in power_strategy(),
        ) {
            let allowed = permits(actor_id, actor_power, target_id, Some(target_power)).is_ok();
            let expected = actor_id == target_id
                || (actor_power >= Power::Admin && actor_power > target_power);
            prop_assert_eq!(allowed, expected);
        }
    }
}
