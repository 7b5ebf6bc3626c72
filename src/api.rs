//! HTTP API handlers
//!
//! Transport-agnostic: the native server (or a test) passes method, URL and
//! body in and gets a status plus a body back. Participant routes answer with
//! a `{status, data | message}` envelope; `/api/spin` answers with the flat
//! `{winner, winnerIndex, finalAngle, segmentAngle, participants}` shape.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::consts::MIN_PARTICIPANTS;
use crate::draw::{self, Selector};
use crate::error::ValidationError;
use crate::persistence::Store;
use crate::renderer::{SvgSurface, WheelRenderer};
use crate::roster::Roster;
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
    Options,
    Other,
}

impl Method {
    pub fn parse(method: &str) -> Self {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "DELETE" => Method::Delete,
            "OPTIONS" => Method::Options,
            _ => Method::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    Svg(String),
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Body,
}

impl ApiResponse {
    fn json(status: u16, value: Value) -> Self {
        Self {
            status,
            body: Body::Json(value),
        }
    }

    fn success(status: u16, data: Value) -> Self {
        Self::json(status, json!({ "status": "success", "data": data }))
    }

    fn fail(status: u16, message: impl ToString) -> Self {
        Self::json(
            status,
            json!({ "status": "fail", "message": message.to_string() }),
        )
    }

    pub fn error(status: u16, message: impl ToString) -> Self {
        Self::json(status, json!({ "error": message.to_string() }))
    }

    pub fn content_type(&self) -> &'static str {
        match self.body {
            Body::Json(_) => "application/json",
            Body::Svg(_) => "image/svg+xml",
            Body::Empty => "text/plain",
        }
    }

    /// Serialized body
    pub fn body_string(&self) -> String {
        match &self.body {
            Body::Json(v) => v.to_string(),
            Body::Svg(s) => s.clone(),
            Body::Empty => String::new(),
        }
    }

    /// JSON body, if any
    pub fn value(&self) -> Option<&Value> {
        match &self.body {
            Body::Json(v) => Some(v),
            _ => None,
        }
    }
}

/// Result of `POST /api/spin`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinResponse {
    pub winner: Value,
    pub winner_index: usize,
    /// Rotation from zero (degrees)
    pub final_angle: f64,
    pub segment_angle: f64,
    pub participants: Vec<Value>,
}

/// Server-side roster plus everything a request may touch
pub struct ApiState {
    roster: Roster,
    store: Box<dyn Store>,
    settings: Settings,
    selector: Selector,
    rng: Pcg32,
    renderer: WheelRenderer<SvgSurface>,
}

impl ApiState {
    pub fn new(settings: Settings, store: Box<dyn Store>) -> Self {
        Self::with_rngs(
            settings,
            store,
            Roster::new(),
            Pcg32::from_rng(&mut rand::rng()),
        )
    }

    pub fn with_rngs(
        settings: Settings,
        store: Box<dyn Store>,
        mut roster: Roster,
        rng: Pcg32,
    ) -> Self {
        let settings = settings.clamped();
        roster.set_max_name_len(settings.max_name_len);
        roster.load(store.as_ref());
        let size = settings.view_size;
        Self {
            roster,
            store,
            selector: Selector::with_max(settings.max_participants),
            settings,
            rng,
            renderer: WheelRenderer::new(Some(SvgSurface::new(size, size)), size),
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn persist(&mut self) {
        if let Err(e) = self.roster.save(self.store.as_mut()) {
            log::warn!("Could not save participants: {}", e);
        }
    }

    fn participants_json(&self) -> Value {
        json!(self.roster.participants())
    }

    /// Route one request
    pub fn handle(&mut self, method: Method, url: &str, body: &str) -> ApiResponse {
        let (path, query) = url.split_once('?').unwrap_or((url, ""));
        let path = path.trim_end_matches('/');

        if method == Method::Options {
            return ApiResponse {
                status: 200,
                body: Body::Empty,
            };
        }

        let payload = match parse_body(body) {
            Ok(v) => v,
            Err(e) => return ApiResponse::error(400, format!("Malformed JSON: {}", e)),
        };

        match (method, path) {
            (Method::Get, "/api/participants") => {
                ApiResponse::success(200, json!({ "participants": self.participants_json() }))
            }
            (Method::Post, "/api/participants") => self.add(&payload),
            (Method::Post, "/api/participants/bulk") => self.add_bulk(&payload),
            (Method::Post, "/api/participants/shuffle") => self.shuffle(),
            (Method::Delete, "/api/participants") => {
                self.roster.clear();
                self.persist();
                ApiResponse::success(200, json!({ "participants": [] }))
            }
            (Method::Delete, "/api/participants/by-name") => self.remove_by_name(&payload),
            (Method::Delete, p) if p.starts_with("/api/participants/") => {
                self.remove(&p["/api/participants/".len()..])
            }
            (Method::Post, "/api/spin") => self.spin(&payload),
            (Method::Get, "/api/wheel.svg") => self.wheel_svg(query),
            _ => ApiResponse::error(404, "Not found"),
        }
    }

    fn add(&mut self, payload: &Value) -> ApiResponse {
        let name = text_field(payload, "name");
        match self.roster.add(&name) {
            Ok(participant) => {
                self.persist();
                ApiResponse::success(
                    201,
                    json!({
                        "participant": participant,
                        "participants": self.participants_json(),
                    }),
                )
            }
            Err(e) => ApiResponse::fail(400, e),
        }
    }

    fn add_bulk(&mut self, payload: &Value) -> ApiResponse {
        let names: Vec<String> = payload
            .get("names")
            .and_then(Value::as_array)
            .map(|list| list.iter().map(value_text).collect())
            .unwrap_or_default();

        match self.roster.add_bulk(&names) {
            Ok(added) => {
                self.persist();
                ApiResponse::success(
                    200,
                    json!({
                        "addedCount": added.len(),
                        "participants": self.participants_json(),
                    }),
                )
            }
            Err(e) => ApiResponse::fail(400, e),
        }
    }

    fn remove(&mut self, id: &str) -> ApiResponse {
        match self.roster.remove(id) {
            Ok(removed) => {
                self.persist();
                ApiResponse::success(
                    200,
                    json!({ "removed": removed, "participants": self.participants_json() }),
                )
            }
            Err(e) => ApiResponse::fail(404, e),
        }
    }

    fn remove_by_name(&mut self, payload: &Value) -> ApiResponse {
        let name = text_field(payload, "name");
        match self.roster.remove_by_name(&name) {
            Ok(removed) => {
                self.persist();
                ApiResponse::success(
                    200,
                    json!({ "removed": removed, "participants": self.participants_json() }),
                )
            }
            Err(e @ ValidationError::NotFound(_)) => ApiResponse::fail(404, e),
            Err(e) => ApiResponse::fail(400, e),
        }
    }

    fn shuffle(&mut self) -> ApiResponse {
        match self.roster.shuffle() {
            Ok(()) => {
                self.persist();
                ApiResponse::success(200, json!({ "participants": self.participants_json() }))
            }
            Err(e) => ApiResponse::fail(400, e),
        }
    }

    /// Spin the posted list, or the stored roster when none was posted
    fn spin(&mut self, payload: &Value) -> ApiResponse {
        if !(payload.is_null() || payload.is_object()) {
            return ApiResponse::error(400, "Request body must be a JSON object");
        }
        let participants: Vec<Value> = match payload.get("participants") {
            Some(Value::Array(list)) => list.clone(),
            Some(_) => return ApiResponse::error(400, self.count_message()),
            None => self
                .roster
                .participants()
                .iter()
                .map(|p| json!(p))
                .collect(),
        };

        match self.draw(participants) {
            Ok(response) => {
                log::info!(
                    "Winner: {} (index {})",
                    value_text(&response.winner),
                    response.winner_index
                );
                ApiResponse::json(200, json!(response))
            }
            Err(ValidationError::TooFewParticipants { .. })
            | Err(ValidationError::TooManyParticipants { .. }) => {
                ApiResponse::error(400, self.count_message())
            }
            Err(e) => ApiResponse::error(400, e),
        }
    }

    fn count_message(&self) -> String {
        format!(
            "Participants array must have {}-{} elements",
            MIN_PARTICIPANTS, self.selector.max
        )
    }

    fn draw(&mut self, participants: Vec<Value>) -> Result<SpinResponse, ValidationError> {
        let count = participants.len();
        let winner_index = self.selector.pick(count, &mut self.rng)?;
        let resolution = draw::resolve(
            winner_index,
            count,
            self.settings.pointer_angle_deg,
            self.settings.extra_turns,
        )?;
        Ok(SpinResponse {
            winner: participants[winner_index].clone(),
            winner_index,
            final_angle: resolution.final_angle,
            segment_angle: resolution.segment_angle,
            participants,
        })
    }

    fn wheel_svg(&mut self, query: &str) -> ApiResponse {
        let rotation_deg = query_param(query, "rotation")
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(0.0);

        self.renderer.draw(&self.roster, rotation_deg.to_radians());
        match self.renderer.surface() {
            Some(surface) => ApiResponse {
                status: 200,
                body: Body::Svg(surface.finish()),
            },
            None => ApiResponse::error(500, "No drawing surface"),
        }
    }
}

fn parse_body(body: &str) -> Result<Value, serde_json::Error> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body)
}

/// Strings as-is, other scalars in their JSON form
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Object(map) => map
            .get("name")
            .map(value_text)
            .unwrap_or_else(|| value.to_string()),
        other => other.to_string(),
    }
}

fn text_field(payload: &Value, key: &str) -> String {
    payload.get(key).map(value_text).unwrap_or_default()
}

fn query_param<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key).then_some(v)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::segment_under_pointer;
    use crate::persistence::MemoryStore;
    use crate::roster::STORAGE_KEY;

    fn state() -> ApiState {
        ApiState::with_rngs(
            Settings::default(),
            Box::new(MemoryStore::default()),
            Roster::with_rng(Pcg32::seed_from_u64(3)),
            Pcg32::seed_from_u64(4),
        )
    }

    fn call(state: &mut ApiState, method: Method, url: &str, body: &str) -> (u16, Value) {
        let response = state.handle(method, url, body);
        let value = response.value().cloned().unwrap_or(Value::Null);
        (response.status, value)
    }

    #[test]
    fn test_add_and_list() {
        let mut s = state();
        let (status, body) = call(&mut s, Method::Post, "/api/participants", r#"{"name":" Ann "}"#);
        assert_eq!(status, 201);
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["participant"]["name"], "Ann");

        let (status, body) = call(&mut s, Method::Get, "/api/participants", "");
        assert_eq!(status, 200);
        assert_eq!(body["data"]["participants"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_add_rejects_blank_and_long() {
        let mut s = state();
        let (status, body) = call(&mut s, Method::Post, "/api/participants", r#"{"name":"  "}"#);
        assert_eq!(status, 400);
        assert_eq!(body["status"], "fail");

        let long = format!(r#"{{"name":"{}"}}"#, "x".repeat(51));
        let (status, _) = call(&mut s, Method::Post, "/api/participants", &long);
        assert_eq!(status, 400);
        assert!(s.roster().is_empty());
    }

    #[test]
    fn test_bulk_skips_blanks() {
        let mut s = state();
        let (status, body) = call(
            &mut s,
            Method::Post,
            "/api/participants/bulk",
            r#"{"names":["a", "", 7, "  b "]}"#,
        );
        assert_eq!(status, 200);
        assert_eq!(body["data"]["addedCount"], 3);

        let (status, _) = call(&mut s, Method::Post, "/api/participants/bulk", r#"{"names":[""]}"#);
        assert_eq!(status, 400);
    }

    #[test]
    fn test_remove_routes() {
        let mut s = state();
        call(&mut s, Method::Post, "/api/participants/bulk", r#"{"names":["a","b","c"]}"#);
        let id = s.roster().get(0).unwrap().id.clone();

        let (status, body) = call(&mut s, Method::Delete, &format!("/api/participants/{}", id), "");
        assert_eq!(status, 200);
        assert_eq!(body["data"]["removed"]["name"], "a");

        let (status, _) = call(&mut s, Method::Delete, &format!("/api/participants/{}", id), "");
        assert_eq!(status, 404);

        let (status, body) =
            call(&mut s, Method::Delete, "/api/participants/by-name", r#"{"name":"c"}"#);
        assert_eq!(status, 200);
        assert_eq!(body["data"]["participants"].as_array().unwrap().len(), 1);

        let (status, _) = call(&mut s, Method::Delete, "/api/participants/by-name", r#"{"name":"zz"}"#);
        assert_eq!(status, 404);
        let (status, _) = call(&mut s, Method::Delete, "/api/participants/by-name", "{}");
        assert_eq!(status, 400);

        let (status, body) = call(&mut s, Method::Delete, "/api/participants", "");
        assert_eq!(status, 200);
        assert_eq!(body["data"]["participants"], json!([]));
        assert!(s.roster().is_empty());
    }

    #[test]
    fn test_mutations_persist() {
        let mut s = state();
        call(&mut s, Method::Post, "/api/participants", r#"{"name":"kept"}"#);
        let stored = s.store.get(STORAGE_KEY).unwrap().unwrap();
        assert!(stored.contains("kept"));
    }

    #[test]
    fn test_shuffle_needs_two() {
        let mut s = state();
        call(&mut s, Method::Post, "/api/participants", r#"{"name":"solo"}"#);
        let (status, _) = call(&mut s, Method::Post, "/api/participants/shuffle", "");
        assert_eq!(status, 400);
        call(&mut s, Method::Post, "/api/participants", r#"{"name":"duo"}"#);
        let (status, body) = call(&mut s, Method::Post, "/api/participants/shuffle", "");
        assert_eq!(status, 200);
        assert_eq!(body["data"]["participants"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_stateless_spin() {
        let mut s = state();
        let (status, body) = call(
            &mut s,
            Method::Post,
            "/api/spin",
            r#"{"participants":[1,3,7,20,50,75,100,500]}"#,
        );
        assert_eq!(status, 200);
        let spin: SpinResponse = serde_json::from_value(body).unwrap();
        assert!(spin.winner_index < 8);
        assert_eq!(spin.winner, spin.participants[spin.winner_index]);
        assert_eq!(spin.segment_angle, 45.0);
        assert!(spin.final_angle >= 8.0 * 360.0 && spin.final_angle < 9.0 * 360.0);
        assert_eq!(
            segment_under_pointer(spin.final_angle, 8, 90.0),
            spin.winner_index
        );
        // Stateless spins leave the stored roster alone
        assert!(s.roster().is_empty());
    }

    #[test]
    fn test_spin_count_bounds() {
        let mut s = state();
        let (status, body) = call(&mut s, Method::Post, "/api/spin", r#"{"participants":["a"]}"#);
        assert_eq!(status, 400);
        assert_eq!(body["error"], "Participants array must have 2-1000 elements");

        let many = json!({ "participants": vec![1; 1001] }).to_string();
        let (status, _) = call(&mut s, Method::Post, "/api/spin", &many);
        assert_eq!(status, 400);

        let (status, _) = call(&mut s, Method::Post, "/api/spin", r#"{"participants":"ab"}"#);
        assert_eq!(status, 400);
    }

    #[test]
    fn test_spin_rejects_non_object_body() {
        let mut s = state();
        call(&mut s, Method::Post, "/api/participants/bulk", r#"{"names":["a","b"]}"#);
        for body in ["[1,2]", "\"ab\"", "7"] {
            let (status, reply) = call(&mut s, Method::Post, "/api/spin", body);
            assert_eq!(status, 400, "body {}", body);
            assert!(reply["error"].is_string());
        }
    }

    #[test]
    fn test_spin_stored_roster() {
        let mut s = state();
        let (status, _) = call(&mut s, Method::Post, "/api/spin", "");
        assert_eq!(status, 400);

        call(&mut s, Method::Post, "/api/participants/bulk", r#"{"names":["a","b","c"]}"#);
        let (status, body) = call(&mut s, Method::Post, "/api/spin", "");
        assert_eq!(status, 200);
        let spin: SpinResponse = serde_json::from_value(body).unwrap();
        assert_eq!(spin.participants.len(), 3);
        let expected = s.roster().get(spin.winner_index).unwrap();
        assert_eq!(spin.winner["id"], expected.id.as_str());
    }

    #[test]
    fn test_malformed_json_and_unknown_route() {
        let mut s = state();
        let (status, body) = call(&mut s, Method::Post, "/api/participants", "{nope");
        assert_eq!(status, 400);
        assert!(body["error"].as_str().unwrap().starts_with("Malformed JSON"));

        let (status, body) = call(&mut s, Method::Get, "/api/nothing", "");
        assert_eq!(status, 404);
        assert_eq!(body["error"], "Not found");

        let response = s.handle(Method::Options, "/api/spin", "");
        assert_eq!(response.status, 200);
        assert_eq!(response.body, Body::Empty);
    }

    #[test]
    fn test_wheel_svg() {
        let mut s = state();
        call(&mut s, Method::Post, "/api/participants/bulk", r#"{"names":["a","b"]}"#);
        let response = s.handle(Method::Get, "/api/wheel.svg?rotation=45", "");
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type(), "image/svg+xml");
        let svg = response.body_string();
        assert!(svg.contains("rotate(45.0000 400.00 400.00)"));

        // Same roster, no rebuild
        s.handle(Method::Get, "/api/wheel.svg", "");
        assert_eq!(s.renderer.cache().rebuilds(), 1);
    }

    #[test]
    fn test_query_param() {
        assert_eq!(query_param("a=1&rotation=30", "rotation"), Some("30"));
        assert_eq!(query_param("", "rotation"), None);
    }
}
