//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the API server.
//! Every message is a JSON object tagged by its `type` field.

use festival_planner_core::{controller::View, domain::Category};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::web::view::Snapshot;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Starts the session. This must be the first message sent on the connection.
    /// A browser without a device id yet is issued one in the reply.
    Init {
        #[serde(default)]
        device_id: Option<Uuid>,
        #[serde(default)]
        auth_token: Option<String>,
    },

    SelectCategory { category: Category },

    /// `month` is zero-based.
    ChangeDate { year: i32, month: u32, day: u32 },

    PreviousMonth,

    NextMonth,

    SelectDay { day: u32 },

    Search { query: String },

    OpenEvent { event_id: String },

    BackToList,

    Navigate { view: View },

    ToggleSave { event_id: String },

    /// Attaches an account session obtained through `/auth/login`.
    SignIn { token: String },

    SignOut,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms successful initialization and tells the browser its device id.
    Initialized { device_id: Uuid, signed_in: bool },

    /// The full render state after a change.
    Snapshot(Snapshot),

    /// Reports a problem with the last client message.
    Error { message: String },
}
