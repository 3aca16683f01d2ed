use std::sync::Arc;

use super::{auth::TokenService, config::Config, database::Store};

pub struct AppState<S> {
    pub config: Config,
    pub store: S,
    pub tokens: TokenService,
}

impl<S: Store> AppState<S> {
    pub fn new(config: Config, store: S) -> Arc<Self> {
        let tokens = TokenService::new(&config.token_secret, config.production);

        Arc::new(Self {
            config,
            store,
            tokens,
        })
    }
}
