use crate::services::verifier::Caller;

pub fn ensure_admin(caller: &Caller) -> Result<(), framework::Error> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(framework::Error::PermissionsDenied)
    }
}

/// Personal-data rule: the caller must be the subject of the request or an
/// admin.
pub fn ensure_self_or_admin(caller: &Caller, email: &str) -> Result<(), framework::Error> {
    if caller.is_admin() || caller.email.as_str() == email {
        Ok(())
    } else {
        Err(framework::Error::PermissionsDenied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::user_account::Role;

    #[test]
    fn admin_passes_every_guard() {
        let admin = Caller::new("ops@example.com", Role::Admin);
        assert!(ensure_admin(&admin).is_ok());
        assert!(ensure_self_or_admin(&admin, "someone@example.com").is_ok());
    }

    #[test]
    fn plain_user_only_passes_for_their_own_email() {
        let caller = Caller::new("alice@example.com", Role::User);
        assert!(ensure_admin(&caller).is_err());
        assert!(ensure_self_or_admin(&caller, "alice@example.com").is_ok());
        assert!(matches!(
            ensure_self_or_admin(&caller, "bob@example.com"),
            Err(framework::Error::PermissionsDenied)
        ));
    }
}
