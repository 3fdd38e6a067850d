//! Access resolution for photos, albums, comments, and admin actions.
//!
//! Every function takes the acting principal explicitly (`Option<&User>` where
//! anonymous access is meaningful) plus the already-loaded resource and, for
//! photos, the principal's share grant if one exists. Nothing here touches the
//! database: callers look the rows up first, so "not found" is settled before
//! any of these run and absence of a grant simply arrives as `None`.
//!
//! All answers are allow/deny booleans. Absence of anything (principal,
//! grant, enabled flag) resolves to deny except for the explicit public /
//! owner / global-role bypasses.

use uuid::Uuid;

use crate::models::{Album, Comment, PermissionLevel, Photo, User, UserRole, Visibility};

/// A principal that is present and enabled; disabled accounts are treated
/// exactly like anonymous ones for every authenticated branch.
fn active(principal: Option<&User>) -> Option<&User> {
    principal.filter(|u| u.enabled)
}

fn is_moderator_or_admin(user: &User) -> bool {
    user.role == UserRole::Admin || user.role == UserRole::Moderator
}

/// Can the principal view the photo (metadata, original bytes, thumbnail)?
///
/// Public photos are readable by everyone, including anonymous callers.
/// Otherwise: moderators/admins, the owner, or any grantee at any level,
/// READ being the floor of the permission order.
pub fn can_view_photo(
    principal: Option<&User>,
    photo: &Photo,
    share: Option<PermissionLevel>,
) -> bool {
    if photo.visibility == Visibility::Public {
        return true;
    }

    let Some(user) = active(principal) else {
        return false;
    };

    if is_moderator_or_admin(user) {
        return true;
    }

    if photo.owner_id == user.id {
        return true;
    }

    share.is_some_and(|level| level.at_least(PermissionLevel::Read))
}

/// Can the principal edit the photo's metadata, delete it, or manage its
/// shares? The three rights are a single policy: global admin, owner, or an
/// ADMIN-level grantee.
///
/// Moderators do NOT get edit rights; their powers are read and comment
/// moderation only.
pub fn can_edit_photo(
    principal: Option<&User>,
    photo: &Photo,
    share: Option<PermissionLevel>,
) -> bool {
    let Some(user) = active(principal) else {
        return false;
    };

    if user.role == UserRole::Admin {
        return true;
    }

    if photo.owner_id == user.id {
        return true;
    }

    share.is_some_and(|level| level.at_least(PermissionLevel::Admin))
}

/// Can the principal comment on the photo?
///
/// Requires an authenticated, enabled principal in every case; on top of
/// that: moderators/admins, the owner, anyone on a public photo, or a
/// grantee at COMMENT level or above.
pub fn can_comment_on_photo(
    principal: Option<&User>,
    photo: &Photo,
    share: Option<PermissionLevel>,
) -> bool {
    let Some(user) = active(principal) else {
        return false;
    };

    if is_moderator_or_admin(user) {
        return true;
    }

    if photo.owner_id == user.id {
        return true;
    }

    if photo.visibility == Visibility::Public {
        return true;
    }

    share.is_some_and(|level| level.at_least(PermissionLevel::Comment))
}

/// Can the principal delete the comment? Author, owner of the photo the
/// comment sits on, or a moderator/admin.
pub fn can_delete_comment(principal: Option<&User>, comment: &Comment, photo: &Photo) -> bool {
    let Some(user) = active(principal) else {
        return false;
    };

    if is_moderator_or_admin(user) {
        return true;
    }

    comment.author_id == user.id || photo.owner_id == user.id
}

/// Can the actor disable, role-change, or delete the target account?
/// Admin only, and never against themselves (lock-out guard).
pub fn can_ban_user(actor: &User, target_id: Uuid) -> bool {
    actor.enabled && actor.role == UserRole::Admin && actor.id != target_id
}

/// Albums have no share granularity: owner or global admin, nobody else.
pub fn can_access_album(principal: Option<&User>, album: &Album) -> bool {
    let Some(user) = active(principal) else {
        return false;
    };

    user.role == UserRole::Admin || album.owner_id == user.id
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(role: UserRole, enabled: bool) -> User {
        User {
            id: Uuid::new_v4(),
            username: "someone".to_string(),
            email: "someone@example.com".to_string(),
            password_hash: "x".to_string(),
            role,
            enabled,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn photo(owner: &User, visibility: Visibility) -> Photo {
        Photo {
            id: 1,
            owner_id: owner.id,
            title: "Summer Trip".to_string(),
            description: None,
            original_filename: "trip.jpg".to_string(),
            storage_key: "abc.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            visibility,
            size_bytes: 1024,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn comment(author: &User, photo: &Photo) -> Comment {
        Comment {
            id: 1,
            photo_id: photo.id,
            author_id: author.id,
            content: "nice".to_string(),
            created_at: Utc::now(),
        }
    }

    fn album(owner: &User) -> Album {
        Album {
            id: 1,
            owner_id: owner.id,
            name: "Holidays".to_string(),
            description: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn public_photo_is_readable_by_anyone() {
        let owner = user(UserRole::User, true);
        let stranger = user(UserRole::User, true);
        let p = photo(&owner, Visibility::Public);

        assert!(can_view_photo(None, &p, None));
        assert!(can_view_photo(Some(&stranger), &p, None));
    }

    #[test]
    fn private_photo_denies_anonymous_and_strangers() {
        let owner = user(UserRole::User, true);
        let stranger = user(UserRole::User, true);
        let p = photo(&owner, Visibility::Private);

        assert!(!can_view_photo(None, &p, None));
        assert!(!can_view_photo(Some(&stranger), &p, None));
    }

    #[test]
    fn disabled_principal_is_treated_as_anonymous() {
        let owner = user(UserRole::User, true);
        let mut banned = user(UserRole::User, false);
        let p = photo(&owner, Visibility::Private);

        // Even a grant does not help a disabled account.
        assert!(!can_view_photo(
            Some(&banned),
            &p,
            Some(PermissionLevel::Admin)
        ));
        assert!(!can_comment_on_photo(
            Some(&banned),
            &p,
            Some(PermissionLevel::Admin)
        ));

        // A disabled admin has no powers either.
        banned.role = UserRole::Admin;
        assert!(!can_edit_photo(Some(&banned), &p, None));
    }

    #[test]
    fn owner_has_full_rights_regardless_of_shares() {
        let owner = user(UserRole::User, true);
        let p = photo(&owner, Visibility::Private);

        assert!(can_view_photo(Some(&owner), &p, None));
        assert!(can_edit_photo(Some(&owner), &p, None));
        assert!(can_comment_on_photo(Some(&owner), &p, None));
    }

    #[test]
    fn moderator_can_view_and_comment_but_not_edit() {
        let owner = user(UserRole::User, true);
        let moderator = user(UserRole::Moderator, true);
        let p = photo(&owner, Visibility::Private);

        assert!(can_view_photo(Some(&moderator), &p, None));
        assert!(can_comment_on_photo(Some(&moderator), &p, None));
        assert!(!can_edit_photo(Some(&moderator), &p, None));
    }

    #[test]
    fn global_admin_can_do_everything() {
        let owner = user(UserRole::User, true);
        let admin = user(UserRole::Admin, true);
        let p = photo(&owner, Visibility::Private);

        assert!(can_view_photo(Some(&admin), &p, None));
        assert!(can_comment_on_photo(Some(&admin), &p, None));
        assert!(can_edit_photo(Some(&admin), &p, None));
    }

    #[test]
    fn admin_share_implies_all_lower_capabilities() {
        let owner = user(UserRole::User, true);
        let grantee = user(UserRole::User, true);
        let p = photo(&owner, Visibility::Private);
        let level = Some(PermissionLevel::Admin);

        assert!(can_view_photo(Some(&grantee), &p, level));
        assert!(can_comment_on_photo(Some(&grantee), &p, level));
        assert!(can_edit_photo(Some(&grantee), &p, level));
    }

    #[test]
    fn read_share_grants_view_only() {
        let owner = user(UserRole::User, true);
        let grantee = user(UserRole::User, true);
        let p = photo(&owner, Visibility::Private);
        let level = Some(PermissionLevel::Read);

        assert!(can_view_photo(Some(&grantee), &p, level));
        assert!(!can_comment_on_photo(Some(&grantee), &p, level));
        assert!(!can_edit_photo(Some(&grantee), &p, level));
    }

    #[test]
    fn comment_share_grants_view_and_comment() {
        let owner = user(UserRole::User, true);
        let grantee = user(UserRole::User, true);
        let p = photo(&owner, Visibility::Private);
        let level = Some(PermissionLevel::Comment);

        assert!(can_view_photo(Some(&grantee), &p, level));
        assert!(can_comment_on_photo(Some(&grantee), &p, level));
        assert!(!can_edit_photo(Some(&grantee), &p, level));
    }

    #[test]
    fn permission_levels_are_totally_ordered() {
        assert!(PermissionLevel::Admin.at_least(PermissionLevel::Comment));
        assert!(PermissionLevel::Admin.at_least(PermissionLevel::Read));
        assert!(PermissionLevel::Comment.at_least(PermissionLevel::Read));
        assert!(!PermissionLevel::Read.at_least(PermissionLevel::Comment));
        assert!(!PermissionLevel::Comment.at_least(PermissionLevel::Admin));
        assert!(PermissionLevel::Read.at_least(PermissionLevel::Read));
    }

    #[test]
    fn authenticated_users_can_comment_on_public_photos() {
        let owner = user(UserRole::User, true);
        let stranger = user(UserRole::User, true);
        let p = photo(&owner, Visibility::Public);

        assert!(can_comment_on_photo(Some(&stranger), &p, None));
        // Anonymous can view public photos but never comment.
        assert!(!can_comment_on_photo(None, &p, None));
    }

    #[test]
    fn comment_deletion_rights() {
        let owner = user(UserRole::User, true);
        let author = user(UserRole::User, true);
        let stranger = user(UserRole::User, true);
        let moderator = user(UserRole::Moderator, true);
        let p = photo(&owner, Visibility::Public);
        let c = comment(&author, &p);

        assert!(can_delete_comment(Some(&author), &c, &p));
        assert!(can_delete_comment(Some(&owner), &c, &p));
        assert!(can_delete_comment(Some(&moderator), &c, &p));
        assert!(!can_delete_comment(Some(&stranger), &c, &p));
        assert!(!can_delete_comment(None, &c, &p));
    }

    #[test]
    fn admin_cannot_ban_themselves() {
        let admin = user(UserRole::Admin, true);
        let other = user(UserRole::User, true);

        assert!(can_ban_user(&admin, other.id));
        assert!(!can_ban_user(&admin, admin.id));
        assert!(!can_ban_user(&other, admin.id));
    }

    #[test]
    fn albums_are_owner_or_admin_only() {
        let owner = user(UserRole::User, true);
        let stranger = user(UserRole::User, true);
        let moderator = user(UserRole::Moderator, true);
        let admin = user(UserRole::Admin, true);
        let a = album(&owner);

        assert!(can_access_album(Some(&owner), &a));
        assert!(can_access_album(Some(&admin), &a));
        assert!(!can_access_album(Some(&moderator), &a));
        assert!(!can_access_album(Some(&stranger), &a));
        assert!(!can_access_album(None, &a));
    }

    #[test]
    fn visibility_flip_scenario() {
        // Upload public -> anonymous B allowed; owner flips to private ->
        // B denied while the owner still succeeds.
        let a = user(UserRole::User, true);
        let mut p = photo(&a, Visibility::Public);

        assert!(can_view_photo(None, &p, None));

        p.visibility = Visibility::Private;
        assert!(!can_view_photo(None, &p, None));
        assert!(can_view_photo(Some(&a), &p, None));
    }

    #[test]
    fn share_revocation_scenario() {
        // A shares with B at COMMENT -> B may comment; A removes the share
        // entirely -> B's next attempt is denied.
        let a = user(UserRole::User, true);
        let b = user(UserRole::User, true);
        let p = photo(&a, Visibility::Private);

        assert!(can_comment_on_photo(
            Some(&b),
            &p,
            Some(PermissionLevel::Comment)
        ));
        assert!(!can_comment_on_photo(Some(&b), &p, None));
    }
}
