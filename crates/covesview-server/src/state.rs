use std::sync::Arc;

use covesview_core::config::AppConfig;
use covesview_core::traits::{DataServerClient, RecordStore, SessionStore};
use covesview_crypto::TidGenerator;
use covesview_identity::IdentityResolver;
use covesview_imageproxy::ImageProxyService;
use covesview_write::vote::VoteCache;

pub struct AppState<S, Sess>
where
    S: RecordStore,
    Sess: SessionStore,
{
    pub store: Arc<S>,
    pub sessions: Arc<Sess>,
    pub dataserver: Arc<dyn DataServerClient>,
    pub identity: Arc<IdentityResolver>,
    pub image_proxy: Arc<ImageProxyService>,
    pub tid: Arc<TidGenerator>,
    pub votes: Arc<VoteCache>,
    pub config: Arc<AppConfig>,
}

// Hand-written rather than `#[derive(Clone)]` so cloning an `AppState` never
// requires `S`/`Sess` themselves to be `Clone` — only the `Arc`s need to be.
impl<S, Sess> Clone for AppState<S, Sess>
where
    S: RecordStore,
    Sess: SessionStore,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            sessions: self.sessions.clone(),
            dataserver: self.dataserver.clone(),
            identity: self.identity.clone(),
            image_proxy: self.image_proxy.clone(),
            tid: self.tid.clone(),
            votes: self.votes.clone(),
            config: self.config.clone(),
        }
    }
}
