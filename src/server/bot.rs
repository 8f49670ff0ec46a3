//! # Vendor Bots
//!
//! A bot serves calendar and option lookups for one vendor. Installing a bot
//! mounts two routes under the `/v1` group:
//!
//! - `GET /calendars/{type}` calls [`Bot::get_calendar`]
//! - `GET /calendars/{type}/{option}` calls [`Bot::get_options`]
//!
//! where `{type}` is the bot's [`Bot::bot_type`].

use super::AppState;
use crate::error::AppError;
use crate::observability::RequestContext;
use async_trait::async_trait;
use axum::extract::{Path, RawQuery};
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Path parameters of a bot route
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams(HashMap<String, String>);

impl RouteParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// The `{option}` segment of the option route
    pub fn option(&self) -> Option<&str> {
        self.get("option")
    }
}

impl From<HashMap<String, String>> for RouteParams {
    fn from(params: HashMap<String, String>) -> Self {
        Self(params)
    }
}

/// Everything a bot gets to see of a request
#[derive(Debug, Clone)]
pub struct BotRequest {
    pub context: RequestContext,
    /// Raw query string, without the leading `?`
    pub query: String,
    pub params: RouteParams,
}

#[async_trait]
pub trait Bot: Send + Sync {
    /// Route segment identifying the vendor
    fn bot_type(&self) -> &str;

    async fn get_calendar(&self, request: BotRequest) -> Result<Value, AppError>;

    async fn get_options(&self, request: BotRequest) -> Result<Value, AppError>;
}

/// Mount the routes of `bot` on `router`
pub fn install_bot(router: Router<AppState>, bot: Arc<dyn Bot>) -> Router<AppState> {
    let calendar_path = format!("/calendars/{}", bot.bot_type());
    let options_path = format!("{calendar_path}/{{option}}");

    let calendar_bot = Arc::clone(&bot);
    let options_bot = bot;

    router
        .route(
            &calendar_path,
            get(
                move |Extension(context): Extension<RequestContext>,
                      RawQuery(query): RawQuery| {
                    let bot = Arc::clone(&calendar_bot);
                    async move {
                        let request = BotRequest {
                            context,
                            query: query.unwrap_or_default(),
                            params: RouteParams::default(),
                        };
                        bot.get_calendar(request).await.map(Json)
                    }
                },
            ),
        )
        .route(
            &options_path,
            get(
                move |Extension(context): Extension<RequestContext>,
                      Path(params): Path<HashMap<String, String>>,
                      RawQuery(query): RawQuery| {
                    let bot = Arc::clone(&options_bot);
                    async move {
                        let request = BotRequest {
                            context,
                            query: query.unwrap_or_default(),
                            params: params.into(),
                        };
                        bot.get_options(request).await.map(Json)
                    }
                },
            ),
        )
}
