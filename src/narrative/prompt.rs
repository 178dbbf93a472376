//! Tour-guide persona and chat message construction.

use crate::geocode::PlaceDescription;

/// System instruction sent with every anecdote request.
pub const TOUR_GUIDE_PERSONA: &str = "\
You are a tour guide.  Your task is to provide in depth, detailed, interesting \
historical factoids in relation to particular locations.  The historical \
factoids for each location should be distinct.  Your tone should be very \
casual, very conversational, and engaging.  You don't need to provide any \
conclusion.  The user will provide you with a location and you will come up \
with one historical factoid about that location.";

/// Build the `messages` array for a chat-completions request: the persona
/// followed by the place as the single user turn.
///
/// ```
/// use place_narrator::geocode::PlaceDescription;
/// use place_narrator::narrative::prompt::build_messages;
///
/// let messages = build_messages(&PlaceDescription::NotFound);
/// assert_eq!(messages[1]["content"], "No nearby streets found");
/// ```
pub fn build_messages(place: &PlaceDescription) -> serde_json::Value {
    serde_json::json!([
        { "role": "system", "content": TOUR_GUIDE_PERSONA },
        { "role": "user",   "content": place.to_string() }
    ])
}
