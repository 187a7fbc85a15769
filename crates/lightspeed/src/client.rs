//! The client facade.
//!
//! [`Client`] ties the three layers together: REST calls go through the
//! rate-limited dispatcher and their payloads are merged into the entity
//! cache before the typed result is returned; gateway dispatches are
//! merged into the cache and then republished to registered handlers,
//! strictly in the order the session produced them.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::task::JoinHandle;

use lightspeed_cache::{CacheEntry, EntityCache, EntityKind, Hydration};
use lightspeed_core::{Error, Result, RetryConfig};
use lightspeed_gateway::{
    ConnectionStatus, DEFAULT_GATEWAY, GatewayConfig, GatewayConnector, Session, SessionEvent,
    SessionHandle, WsConnector,
};
use lightspeed_http::data::{
    DataBanUser, DataCreateCategory, DataCreateInvite, DataCreateStream, DataCreateUser,
    DataEditCategory, DataEditStream, DataEditUser, DataReportContent, DataSendMessage,
};
use lightspeed_http::{HttpConfig, RestClient};

use crate::events::{CacheAction, EventKind, cache_action};
use crate::models::{
    AggregateStream, BanInformation, BanList, Category, InviteInformation, Message, Region,
    Stream, User,
};

/// What a registered handler receives for one dispatch event.
#[derive(Clone, Debug)]
pub struct EventContext {
    /// Parsed event kind.
    pub kind: EventKind,
    /// Raw wire event name; distinguishes [`EventKind::Unknown`] events.
    pub event: String,
    /// Sequence number, when the frame carried one.
    pub seq: Option<u64>,
    /// Raw event body.
    pub data: Value,
    /// The merged cache entry after this event was applied, for events
    /// that touch a cached entity.
    pub entry: Option<CacheEntry>,
}

type EventHandler = dyn Fn(EventContext) -> BoxFuture<'static, ()> + Send + Sync;
type NoticeHandler = dyn Fn(Error) -> BoxFuture<'static, ()> + Send + Sync;

/// Configuration for [`Client`].
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// REST dispatcher configuration.
    pub http: HttpConfig,
    /// Event-stream endpoint URL.
    pub gateway_url: String,
    /// Backoff shape for gateway reconnects.
    pub reconnect: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            gateway_url: DEFAULT_GATEWAY.to_owned(),
            reconnect: RetryConfig::default(),
        }
    }
}

/// A connection to the Lightspeed API.
pub struct Client {
    rest: RestClient,
    cache: Arc<EntityCache>,
    config: ClientConfig,
    token: parking_lot::RwLock<Option<String>>,
    /// Path → server-issued user ID, the key user entries are cached
    /// under. Refreshed from every absorbed user payload.
    user_paths: parking_lot::RwLock<HashMap<String, String>>,
    handlers: Arc<parking_lot::RwLock<HashMap<EventKind, Arc<EventHandler>>>>,
    notice: Arc<parking_lot::RwLock<Option<Arc<NoticeHandler>>>>,
    session: parking_lot::Mutex<Option<SessionHandle>>,
    pump: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl Client {
    /// Build a client from configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let rest = RestClient::new(config.http.clone())?;
        Ok(Self {
            rest,
            cache: Arc::new(EntityCache::new()),
            config,
            token: parking_lot::RwLock::new(None),
            user_paths: parking_lot::RwLock::new(HashMap::new()),
            handlers: Arc::new(parking_lot::RwLock::new(HashMap::new())),
            notice: Arc::new(parking_lot::RwLock::new(None)),
            session: parking_lot::Mutex::new(None),
            pump: parking_lot::Mutex::new(None),
        })
    }

    /// Build a client for the default endpoints.
    pub fn default_endpoints() -> Result<Self> {
        Self::new(ClientConfig::default())
    }

    /// The underlying REST dispatcher, for raw access.
    #[must_use]
    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    /// The shared entity cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<EntityCache> {
        &self.cache
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────

    /// Authenticate with a session token and return the current user.
    pub async fn login(&self, token: &str) -> Result<User> {
        let raw = self.rest.static_login(token).await?;
        *self.token.write() = Some(token.trim().to_owned());
        self.absorb(EntityKind::User, &raw, Hydration::Full);
        let user: User = parse(raw)?;
        tracing::info!(user = %user.username, "logged in");
        Ok(user)
    }

    /// Open the event-stream connection. Requires a prior [`login`].
    ///
    /// [`login`]: Client::login
    pub async fn connect(&self) -> Result<()> {
        self.connect_with(Arc::new(WsConnector)).await
    }

    /// Open the event-stream connection over a custom transport.
    pub async fn connect_with(&self, connector: Arc<dyn GatewayConnector>) -> Result<()> {
        let token = self
            .token
            .read()
            .clone()
            .ok_or_else(|| Error::AuthenticationFailure {
                message: "login is required before connecting".into(),
            })?;

        // Replace any previous session outright; the new one shares
        // nothing with it.
        let previous = self.session.lock().take();
        if let Some(previous) = previous {
            previous.close().await;
        }
        let previous_pump = self.pump.lock().take();
        if let Some(previous_pump) = previous_pump {
            let _ = previous_pump.await;
        }

        let gateway = GatewayConfig {
            url: self.config.gateway_url.clone(),
            reconnect: self.config.reconnect.clone(),
            ..GatewayConfig::new(token)
        };
        let (handle, events) = Session::spawn(connector, gateway);
        *self.session.lock() = Some(handle);

        let pump = tokio::spawn(pump(
            events,
            Arc::clone(&self.cache),
            Arc::clone(&self.handlers),
            Arc::clone(&self.notice),
        ));
        *self.pump.lock() = Some(pump);
        Ok(())
    }

    /// Current event-stream status, if a session was started.
    #[must_use]
    pub fn status(&self) -> Option<ConnectionStatus> {
        self.session.lock().as_ref().map(SessionHandle::status)
    }

    /// Close the event-stream connection and stop delivering events.
    pub async fn close(&self) {
        let session = self.session.lock().take();
        if let Some(session) = session {
            session.close().await;
        }
        let pump = self.pump.lock().take();
        if let Some(pump) = pump {
            let _ = pump.await;
        }
    }

    /// Forget the session token.
    pub fn logout(&self) {
        self.rest.logout();
        *self.token.write() = None;
    }

    // ─── Handler registration ────────────────────────────────────────────

    /// Register the handler for one event kind, replacing any previous
    /// one. Handlers run sequentially in event order; a slow handler
    /// delays everything behind it.
    pub fn on<F, Fut>(&self, kind: EventKind, handler: F)
    where
        F: Fn(EventContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler: Arc<EventHandler> = Arc::new(move |ctx| Box::pin(handler(ctx)));
        let _ = self.handlers.write().insert(kind, handler);
    }

    /// Register the handler for out-of-band session faults:
    /// [`Error::SessionInvalidated`] after a failed resume (the cache has
    /// already been cleared) and [`Error::AuthenticationFailure`] when
    /// the server rejects the credentials mid-session.
    pub fn on_notice<F, Fut>(&self, handler: F)
    where
        F: Fn(Error) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler: Arc<NoticeHandler> = Arc::new(move |err| Box::pin(handler(err)));
        *self.notice.write() = Some(handler);
    }

    // ─── Regions ─────────────────────────────────────────────────────────

    /// Fetch all streaming regions.
    pub async fn get_regions(&self) -> Result<Vec<Region>> {
        let raw = self.rest.get_regions().await?;
        self.absorb_list(EntityKind::Region, &raw, Hydration::Full);
        parse(raw)
    }

    // ─── Streams ─────────────────────────────────────────────────────────

    /// Find global streams.
    pub async fn get_streams(&self) -> Result<Vec<AggregateStream>> {
        let raw = self.rest.get_streams().await?;
        if let Some(items) = raw.as_array() {
            for item in items {
                self.absorb_aggregate(item);
            }
        }
        parse(raw)
    }

    /// Enable streaming on this account with an invite code.
    pub async fn create_stream(&self, payload: &DataCreateStream) -> Result<Stream> {
        let raw = self.rest.create_stream(payload).await?;
        self.absorb(EntityKind::Stream, &raw, Hydration::Full);
        parse(raw)
    }

    /// Fetch own stream information.
    pub async fn my_stream(&self) -> Result<Stream> {
        let raw = self.rest.my_stream().await?;
        self.absorb(EntityKind::Stream, &raw, Hydration::Full);
        parse(raw)
    }

    /// Edit own stream information.
    pub async fn edit_my_stream(&self, payload: &DataEditStream) -> Result<Stream> {
        let raw = self.rest.edit_my_stream(payload).await?;
        self.absorb(EntityKind::Stream, &raw, Hydration::Full);
        parse(raw)
    }

    /// Fetch a stream by the owner's path.
    pub async fn get_stream(&self, user_path: &str) -> Result<AggregateStream> {
        let raw = self.rest.get_stream(user_path).await?;
        self.absorb_aggregate(&raw);
        parse(raw)
    }

    /// Fetch all banned users in a stream.
    pub async fn get_stream_bans(&self, stream_id: &str) -> Result<BanList> {
        let raw = self.rest.get_stream_bans(stream_id).await?;
        if let Some(users) = raw.get("users") {
            self.absorb_list(EntityKind::User, users, Hydration::Full);
        }
        parse(raw)
    }

    /// Fetch all moderators of a stream.
    pub async fn get_stream_moderators(&self, stream_id: &str) -> Result<Vec<User>> {
        let raw = self.rest.get_stream_moderators(stream_id).await?;
        self.absorb_list(EntityKind::User, &raw, Hydration::Full);
        parse(raw)
    }

    /// Reset the token used for this account's stream.
    pub async fn reset_stream_token(&self) -> Result<Stream> {
        let raw = self.rest.reset_stream_token().await?;
        self.absorb(EntityKind::Stream, &raw, Hydration::Full);
        parse(raw)
    }

    // ─── Moderation ──────────────────────────────────────────────────────

    /// Ban a user from talking in a stream chat.
    pub async fn ban(&self, stream_id: &str, user_id: &str, payload: &DataBanUser) -> Result<()> {
        let _ = self.rest.ban(stream_id, user_id, payload).await?;
        Ok(())
    }

    /// Unban a user.
    pub async fn unban(&self, stream_id: &str, user_id: &str) -> Result<()> {
        let _ = self.rest.unban(stream_id, user_id).await?;
        Ok(())
    }

    /// Give a user moderation powers on a stream.
    pub async fn promote(&self, stream_id: &str, user_id: &str) -> Result<()> {
        let _ = self.rest.promote(stream_id, user_id).await?;
        Ok(())
    }

    /// Take away a user's moderation powers on a stream.
    pub async fn demote(&self, stream_id: &str, user_id: &str) -> Result<()> {
        let _ = self.rest.demote(stream_id, user_id).await?;
        Ok(())
    }

    // ─── Followers ───────────────────────────────────────────────────────

    /// Follow a stream.
    pub async fn follow_stream(&self, stream_id: &str) -> Result<()> {
        let _ = self.rest.follow_stream(stream_id).await?;
        Ok(())
    }

    /// Unfollow a stream.
    pub async fn unfollow_stream(&self, stream_id: &str) -> Result<()> {
        let _ = self.rest.unfollow_stream(stream_id).await?;
        Ok(())
    }

    // ─── Users ───────────────────────────────────────────────────────────

    /// Fetch own user.
    pub async fn get_me(&self) -> Result<User> {
        let raw = self.rest.get_me().await?;
        self.absorb(EntityKind::User, &raw, Hydration::Full);
        parse(raw)
    }

    /// Create a new user profile.
    pub async fn create_user(&self, payload: &DataCreateUser) -> Result<User> {
        let raw = self.rest.create_user(payload).await?;
        self.absorb(EntityKind::User, &raw, Hydration::Full);
        parse(raw)
    }

    /// Edit own user information.
    pub async fn edit_my_user(&self, payload: &DataEditUser) -> Result<User> {
        let raw = self.rest.edit_my_user(payload).await?;
        self.absorb(EntityKind::User, &raw, Hydration::Full);
        parse(raw)
    }

    /// Fetch a user by their path, reading through the cache.
    ///
    /// Cache entries are keyed by the server-issued ID, so the lookup
    /// goes through the path → ID index. A fully hydrated cached entry
    /// is returned without a network call; anything else fetches over
    /// REST and hydrates the cache.
    pub async fn get_user(&self, user_path: &str) -> Result<User> {
        if let Some(user) = self.cached_user(user_path) {
            return Ok(user);
        }
        let raw = self.rest.get_user(user_path).await?;
        self.absorb(EntityKind::User, &raw, Hydration::Full);
        parse(raw)
    }

    /// Fetch all of your bans.
    pub async fn my_bans(&self) -> Result<Vec<BanInformation>> {
        let raw = self.rest.my_bans().await?;
        parse(raw)
    }

    // ─── Categories ──────────────────────────────────────────────────────

    /// Create a new category of streams.
    pub async fn create_category(&self, payload: &DataCreateCategory) -> Result<Category> {
        let raw = self.rest.create_category(payload).await?;
        self.absorb(EntityKind::Category, &raw, Hydration::Full);
        parse(raw)
    }

    /// Delete a streaming category.
    pub async fn delete_category(&self, category_id: &str) -> Result<()> {
        let _ = self.rest.delete_category(category_id).await?;
        let _ = self.cache.invalidate(EntityKind::Category, category_id);
        Ok(())
    }

    /// Change information for an existing category.
    pub async fn edit_category(
        &self,
        category_id: &str,
        payload: &DataEditCategory,
    ) -> Result<Category> {
        let raw = self.rest.edit_category(category_id, payload).await?;
        self.absorb(EntityKind::Category, &raw, Hydration::Full);
        parse(raw)
    }

    /// List available streaming categories.
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        let raw = self.rest.list_categories().await?;
        self.absorb_list(EntityKind::Category, &raw, Hydration::Full);
        parse(raw)
    }

    // ─── Chat ────────────────────────────────────────────────────────────

    /// Fetch chat message history for a stream.
    pub async fn get_chat_messages(&self, chat_id: &str) -> Result<Vec<Message>> {
        let raw = self.rest.get_chat_messages(chat_id).await?;
        self.absorb_list(EntityKind::Message, &raw, Hydration::Full);
        parse(raw)
    }

    /// Send a message to a stream chat.
    pub async fn create_chat_message(
        &self,
        chat_id: &str,
        payload: &DataSendMessage,
    ) -> Result<Message> {
        let raw = self.rest.create_chat_message(chat_id, payload).await?;
        self.absorb(EntityKind::Message, &raw, Hydration::Full);
        parse(raw)
    }

    /// Delete a chat message by its ID.
    pub async fn delete_chat_message(&self, chat_id: &str, message_id: &str) -> Result<()> {
        let _ = self.rest.delete_chat_message(chat_id, message_id).await?;
        let _ = self.cache.invalidate(EntityKind::Message, message_id);
        Ok(())
    }

    // ─── Admin ───────────────────────────────────────────────────────────

    /// List all pending and used stream invites.
    pub async fn list_stream_invites(&self) -> Result<Vec<InviteInformation>> {
        let raw = self.rest.list_stream_invites().await?;
        parse(raw)
    }

    /// Create a new invite for streaming.
    pub async fn create_stream_invite(
        &self,
        payload: &DataCreateInvite,
    ) -> Result<InviteInformation> {
        let raw = self.rest.create_stream_invite(payload).await?;
        parse(raw)
    }

    /// Delete an existing unclaimed stream invite.
    pub async fn delete_stream_invite(&self, invite_code: &str) -> Result<()> {
        let _ = self.rest.delete_stream_invite(invite_code).await?;
        Ok(())
    }

    /// Edit stream information as a site administrator.
    pub async fn edit_stream_as_admin(
        &self,
        stream_id: &str,
        payload: &DataEditStream,
    ) -> Result<Stream> {
        let raw = self.rest.edit_stream_as_admin(stream_id, payload).await?;
        self.absorb(EntityKind::Stream, &raw, Hydration::Full);
        parse(raw)
    }

    /// Edit user information as a site administrator.
    pub async fn edit_user_as_admin(&self, user_id: &str, payload: &DataEditUser) -> Result<User> {
        let raw = self.rest.edit_user_as_admin(user_id, payload).await?;
        self.absorb(EntityKind::User, &raw, Hydration::Full);
        parse(raw)
    }

    /// Find all live streams, including hidden ones.
    pub async fn get_streams_as_admin(&self) -> Result<Vec<AggregateStream>> {
        let raw = self.rest.get_streams_as_admin().await?;
        if let Some(items) = raw.as_array() {
            for item in items {
                self.absorb_aggregate(item);
            }
        }
        parse(raw)
    }

    /// Disconnect all users from a stream and stop it.
    pub async fn stop_stream_as_admin(&self, stream_id: &str) -> Result<()> {
        let _ = self.rest.stop_stream_as_admin(stream_id).await?;
        Ok(())
    }

    // ─── Reports ─────────────────────────────────────────────────────────

    /// Report content to Lightspeed.
    pub async fn report(&self, payload: &DataReportContent) -> Result<()> {
        let _ = self.rest.report(payload).await?;
        Ok(())
    }

    // ─── Cache forwarding ────────────────────────────────────────────────

    /// Merge one entity payload into the cache, keyed by its `_id`.
    /// User payloads also refresh the path → ID index.
    fn absorb(&self, kind: EntityKind, value: &Value, hydration: Hydration) {
        if let Some(id) = value.get("_id").and_then(Value::as_str) {
            let _ = self.cache.upsert(kind, id, value, hydration);
            if kind == EntityKind::User {
                if let Some(path) = value.get("path").and_then(Value::as_str) {
                    let _ = self
                        .user_paths
                        .write()
                        .insert(path.to_owned(), id.to_owned());
                }
            }
        }
    }

    /// Merge every element of an entity array into the cache.
    fn absorb_list(&self, kind: EntityKind, value: &Value, hydration: Hydration) {
        if let Some(items) = value.as_array() {
            for item in items {
                self.absorb(kind, item, hydration);
            }
        }
    }

    /// Merge the parts of an aggregate stream payload into the cache.
    fn absorb_aggregate(&self, value: &Value) {
        if let Some(user) = value.get("user") {
            self.absorb(EntityKind::User, user, Hydration::Full);
        }
        if let Some(stream) = value.get("stream") {
            self.absorb(EntityKind::Stream, stream, Hydration::Full);
        }
        if let Some(category) = value.get("category") {
            self.absorb(EntityKind::Category, category, Hydration::Full);
        }
    }

    /// A fully hydrated user served from the cache via the path index.
    fn cached_user(&self, user_path: &str) -> Option<User> {
        let id = self.user_paths.read().get(user_path).cloned()?;
        self.cached(EntityKind::User, &id)
    }

    /// A fully hydrated cache entry parsed as `T`, if present.
    fn cached<T: DeserializeOwned>(&self, kind: EntityKind, id: &str) -> Option<T> {
        let entry = self.cache.get(kind, id)?;
        if entry.hydration != Hydration::Full {
            return None;
        }
        serde_json::from_value(entry.data).ok()
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("rest", &self.rest)
            .field("cache_entries", &self.cache.len())
            .finish_non_exhaustive()
    }
}

/// Parse a raw payload into its typed model.
fn parse<T: DeserializeOwned>(value: Value) -> Result<T> {
    Ok(serde_json::from_value(value)?)
}

/// The event pump: applies each session event to the cache, then
/// republishes it. Runs until the session ends.
async fn pump(
    mut events: tokio::sync::mpsc::Receiver<SessionEvent>,
    cache: Arc<EntityCache>,
    handlers: Arc<parking_lot::RwLock<HashMap<EventKind, Arc<EventHandler>>>>,
    notice: Arc<parking_lot::RwLock<Option<Arc<NoticeHandler>>>>,
) {
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::Dispatch { seq, event, data } => {
                let kind = EventKind::parse(&event);
                let entry = match cache_action(kind, &data) {
                    Some(CacheAction::Upsert {
                        kind: entity,
                        id,
                        hydration,
                    }) => Some(cache.upsert(entity, &id, &data, hydration)),
                    Some(CacheAction::Invalidate { kind: entity, id }) => {
                        cache.invalidate(entity, &id)
                    }
                    None => None,
                };

                let handler = handlers.read().get(&kind).cloned();
                if let Some(handler) = handler {
                    handler(EventContext {
                        kind,
                        event,
                        seq,
                        data,
                        entry,
                    })
                    .await;
                }
            }
            SessionEvent::Invalidated => {
                // Events may have been missed in the gap; everything
                // cached is suspect.
                tracing::warn!("session invalidated; cache cleared");
                cache.clear();
                let handler = notice.read().clone();
                if let Some(handler) = handler {
                    handler(Error::SessionInvalidated).await;
                }
            }
            SessionEvent::Fatal { message } => {
                let handler = notice.read().clone();
                if let Some(handler) = handler {
                    handler(Error::AuthenticationFailure { message }).await;
                }
                break;
            }
        }
    }
}
