//! Typed call surface: one method per remote route.
//!
//! Every method funnels through [`RestClient::execute`] and returns the
//! raw JSON payload; typed models live in the facade crate. Paths and
//! methods mirror the server's route table.

use reqwest::Method;
use serde_json::Value;

use lightspeed_core::Result;

use crate::client::RestClient;
use crate::data::{
    DataBanUser, DataCreateCategory, DataCreateInvite, DataCreateStream, DataCreateUser,
    DataEditCategory, DataEditStream, DataEditUser, DataReportContent, DataSendMessage,
};
use crate::routes::Route;

impl RestClient {
    // ─── Regions ─────────────────────────────────────────────────────────

    /// Fetch all streaming regions.
    pub async fn get_regions(&self) -> Result<Value> {
        self.request(Route::new(Method::GET, "/regions")).await
    }

    // ─── Streams ─────────────────────────────────────────────────────────

    /// Find global streams.
    pub async fn get_streams(&self) -> Result<Value> {
        self.request(Route::new(Method::GET, "/streams/")).await
    }

    /// Enable streaming on a user account. Requires creating a user
    /// first.
    pub async fn create_stream(&self, payload: &DataCreateStream) -> Result<Value> {
        self.request_json(Route::new(Method::PUT, "/streams/"), payload)
            .await
    }

    /// Fetch own stream information.
    pub async fn my_stream(&self) -> Result<Value> {
        self.request(Route::new(Method::GET, "/streams/@me")).await
    }

    /// Edit own stream information.
    pub async fn edit_my_stream(&self, payload: &DataEditStream) -> Result<Value> {
        self.request_json(Route::new(Method::PATCH, "/streams/@me"), payload)
            .await
    }

    /// Fetch a stream by its path.
    pub async fn get_stream(&self, user_path: &str) -> Result<Value> {
        self.request(Route::new(Method::GET, "/streams/{user_path}").param("user_path", user_path))
            .await
    }

    /// Fetch all banned users in a stream.
    pub async fn get_stream_bans(&self, stream_id: &str) -> Result<Value> {
        self.request(
            Route::new(Method::GET, "/streams/{stream_id}/bans").param("stream_id", stream_id),
        )
        .await
    }

    /// Fetch all moderators of a stream.
    pub async fn get_stream_moderators(&self, stream_id: &str) -> Result<Value> {
        self.request(
            Route::new(Method::GET, "/streams/{stream_id}/moderators")
                .param("stream_id", stream_id),
        )
        .await
    }

    /// Reset the token used for this account's stream.
    pub async fn reset_stream_token(&self) -> Result<Value> {
        self.request(Route::new(Method::POST, "/streams/reset_token"))
            .await
    }

    // ─── Moderation ──────────────────────────────────────────────────────

    /// Ban a user from talking in a stream chat.
    pub async fn ban(
        &self,
        stream_id: &str,
        user_id: &str,
        payload: &DataBanUser,
    ) -> Result<Value> {
        self.request_json(
            Route::new(Method::PUT, "/streams/{stream_id}/bans/{user_id}")
                .param("stream_id", stream_id)
                .param("user_id", user_id),
            payload,
        )
        .await
    }

    /// Unban a user.
    pub async fn unban(&self, stream_id: &str, user_id: &str) -> Result<Value> {
        self.request(
            Route::new(Method::DELETE, "/streams/{stream_id}/bans/{user_id}")
                .param("stream_id", stream_id)
                .param("user_id", user_id),
        )
        .await
    }

    /// Give a user moderation powers on a stream.
    pub async fn promote(&self, stream_id: &str, user_id: &str) -> Result<Value> {
        self.request(
            Route::new(Method::PUT, "/streams/{stream_id}/mods/{user_id}")
                .param("stream_id", stream_id)
                .param("user_id", user_id),
        )
        .await
    }

    /// Take away a user's moderation powers on a stream.
    pub async fn demote(&self, stream_id: &str, user_id: &str) -> Result<Value> {
        self.request(
            Route::new(Method::DELETE, "/streams/{stream_id}/mods/{user_id}")
                .param("stream_id", stream_id)
                .param("user_id", user_id),
        )
        .await
    }

    // ─── Followers ───────────────────────────────────────────────────────

    /// Follow a stream.
    pub async fn follow_stream(&self, stream_id: &str) -> Result<Value> {
        self.request(
            Route::new(Method::PUT, "/streams/{stream_id}/follow").param("stream_id", stream_id),
        )
        .await
    }

    /// Unfollow a stream.
    pub async fn unfollow_stream(&self, stream_id: &str) -> Result<Value> {
        self.request(
            Route::new(Method::DELETE, "/streams/{stream_id}/follow").param("stream_id", stream_id),
        )
        .await
    }

    // ─── Users ───────────────────────────────────────────────────────────

    /// Fetch own user.
    pub async fn get_me(&self) -> Result<Value> {
        self.request(Route::new(Method::GET, "/users/@me")).await
    }

    /// Create a new user profile.
    pub async fn create_user(&self, payload: &DataCreateUser) -> Result<Value> {
        self.request_json(Route::new(Method::PUT, "/users/@me"), payload)
            .await
    }

    /// Edit own user information.
    pub async fn edit_my_user(&self, payload: &DataEditUser) -> Result<Value> {
        self.request_json(Route::new(Method::PATCH, "/users/@me"), payload)
            .await
    }

    /// Fetch a user by their path.
    pub async fn get_user(&self, user_path: &str) -> Result<Value> {
        self.request(Route::new(Method::GET, "/users/{user_path}").param("user_path", user_path))
            .await
    }

    /// Fetch all of your bans.
    pub async fn my_bans(&self) -> Result<Value> {
        self.request(Route::new(Method::GET, "/users/bans")).await
    }

    // ─── Categories ──────────────────────────────────────────────────────

    /// Create a new category of streams.
    pub async fn create_category(&self, payload: &DataCreateCategory) -> Result<Value> {
        self.request_json(Route::new(Method::POST, "/categories/create"), payload)
            .await
    }

    /// Delete a streaming category.
    pub async fn delete_category(&self, category_id: &str) -> Result<Value> {
        self.request(
            Route::new(Method::DELETE, "/categories/{category_id}")
                .param("category_id", category_id),
        )
        .await
    }

    /// Change information for an existing category.
    pub async fn edit_category(
        &self,
        category_id: &str,
        payload: &DataEditCategory,
    ) -> Result<Value> {
        self.request_json(
            Route::new(Method::PATCH, "/categories/{category_id}")
                .param("category_id", category_id),
            payload,
        )
        .await
    }

    /// List available streaming categories.
    pub async fn list_categories(&self) -> Result<Value> {
        self.request(Route::new(Method::GET, "/categories/")).await
    }

    // ─── Chat ────────────────────────────────────────────────────────────

    /// Fetch chat message history for a stream.
    pub async fn get_chat_messages(&self, chat_id: &str) -> Result<Value> {
        self.request(Route::new(Method::GET, "/chat/{chat_id}/messages").param("chat_id", chat_id))
            .await
    }

    /// Send a message to a stream chat.
    pub async fn create_chat_message(
        &self,
        chat_id: &str,
        payload: &DataSendMessage,
    ) -> Result<Value> {
        self.request_json(
            Route::new(Method::POST, "/chat/{chat_id}/messages").param("chat_id", chat_id),
            payload,
        )
        .await
    }

    /// Delete a chat message by its ID.
    pub async fn delete_chat_message(&self, chat_id: &str, message_id: &str) -> Result<Value> {
        self.request(
            Route::new(Method::DELETE, "/chat/{chat_id}/messages/{message_id}")
                .param("chat_id", chat_id)
                .param("message_id", message_id),
        )
        .await
    }

    // ─── Admin ───────────────────────────────────────────────────────────

    /// List all pending and used stream invites.
    pub async fn list_stream_invites(&self) -> Result<Value> {
        self.request(Route::new(Method::GET, "/admin/invites")).await
    }

    /// Create a new invite for streaming.
    pub async fn create_stream_invite(&self, payload: &DataCreateInvite) -> Result<Value> {
        self.request_json(Route::new(Method::POST, "/admin/invites"), payload)
            .await
    }

    /// Delete an existing unclaimed stream invite.
    pub async fn delete_stream_invite(&self, invite_code: &str) -> Result<Value> {
        self.request(
            Route::new(Method::DELETE, "/admin/invites/{invite_code}")
                .param("invite_code", invite_code),
        )
        .await
    }

    /// Edit stream information as a site administrator.
    pub async fn edit_stream_as_admin(
        &self,
        stream_id: &str,
        payload: &DataEditStream,
    ) -> Result<Value> {
        self.request_json(
            Route::new(Method::PATCH, "/admin/streams/{stream_id}").param("stream_id", stream_id),
            payload,
        )
        .await
    }

    /// Edit user information as a site administrator.
    pub async fn edit_user_as_admin(
        &self,
        user_id: &str,
        payload: &DataEditUser,
    ) -> Result<Value> {
        self.request_json(
            Route::new(Method::PATCH, "/admin/users/{user_id}").param("user_id", user_id),
            payload,
        )
        .await
    }

    /// Find all live streams, including hidden ones.
    pub async fn get_streams_as_admin(&self) -> Result<Value> {
        self.request(Route::new(Method::GET, "/admin/livestreams"))
            .await
    }

    /// Disconnect all users from a stream and stop it.
    pub async fn stop_stream_as_admin(&self, stream_id: &str) -> Result<Value> {
        self.request(
            Route::new(Method::POST, "/admin/streams/{stream_id}/stop")
                .param("stream_id", stream_id),
        )
        .await
    }

    // ─── Reports ─────────────────────────────────────────────────────────

    /// Report content to Lightspeed.
    pub async fn report(&self, payload: &DataReportContent) -> Result<Value> {
        self.request_json(Route::new(Method::POST, "/reports/send"), payload)
            .await
    }
}
