use url::Url;

use crate::invites::manager::InviteLinkManager;

#[derive(Clone)]
pub struct AppState {
    pub invites: InviteLinkManager,
    pub public_base_url: Url,
}
