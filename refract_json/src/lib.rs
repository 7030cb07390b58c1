use refract::{
    chrono::{DateTime, SecondsFormat, Utc},
    sun::{SunPosition, SunTimes},
    *,
};
use serde_json::Value;
use std::io;
use thiserror::Error;

pub use serde_json;

#[derive(Debug, Error)]
pub enum JsonError {
    #[error("missing field `{0}`")]
    Missing(&'static str),
    #[error("invalid value for field `{0}`")]
    Invalid(&'static str),
    #[error("slot {0} is out of range, there are only {max} slots", max = MAX_PRISMS)]
    SlotOutOfRange(u64),
    #[error("a user cannot have more than {max} slots", max = MAX_PRISMS)]
    TooManySlots,
    #[error("invalid prism size: {0}")]
    InvalidSize(Float),
    #[error("invalid timestamp: {0}")]
    Timestamp(#[from] refract::chrono::ParseError),
    #[error("malformed json: {0}")]
    Syntax(#[from] serde_json::Error),
}

pub type Result<T, E = JsonError> = core::result::Result<T, E>;

fn point_to_json(p: &Point) -> Value {
    serde_json::json!([p.x, p.y])
}

fn instant_to_json(instant: &DateTime<Utc>) -> Value {
    Value::String(instant.to_rfc3339_opts(SecondsFormat::Millis, true))
}

pub fn parse_instant(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

/// A field that may be absent or `null`, but must be a number otherwise.
fn opt_float(json: &Value, name: &'static str) -> Result<Option<Float>> {
    match json.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_f64().map(Some).ok_or(JsonError::Invalid(name)),
    }
}

fn float(json: &Value, name: &'static str) -> Result<Float> {
    opt_float(json, name)?.ok_or(JsonError::Missing(name))
}

/// Missing strings are empty, like the relay sends them.
fn string<'a>(json: &'a Value, name: &'static str) -> Result<&'a str> {
    match json.get(name) {
        None | Some(Value::Null) => Ok(""),
        Some(value) => value.as_str().ok_or(JsonError::Invalid(name)),
    }
}

fn slot(json: &Value, name: &'static str) -> Result<SlotId> {
    let index = json
        .get(name)
        .ok_or(JsonError::Missing(name))?
        .as_u64()
        .ok_or(JsonError::Invalid(name))?;

    usize::try_from(index)
        .ok()
        .and_then(SlotId::new)
        .ok_or(JsonError::SlotOutOfRange(index))
}

/// Reads the anchor fields of a prism. Missing coordinates, or the relay's
/// placeholder (both zero with no city name), mean the prism has no anchor.
fn anchor(json: &Value) -> Result<Option<GeoAnchor>> {
    let city = string(json, "cityName")?;

    let (Some(latitude), Some(longitude)) = (opt_float(json, "cityLat")?, opt_float(json, "cityLon")?)
    else {
        return Ok(None);
    };

    if latitude == 0.0 && longitude == 0.0 && city.is_empty() {
        return Ok(None);
    }

    Ok(Some(GeoAnchor::new(latitude, longitude).with_city(city)))
}

fn anchor_fields(anchor: Option<&GeoAnchor>) -> [(&'static str, Value); 3] {
    match anchor {
        Some(a) => [
            ("cityName", a.city.as_str().into()),
            ("cityLat", a.latitude.into()),
            ("cityLon", a.longitude.into()),
        ],
        None => [
            ("cityName", "".into()),
            ("cityLat", serde_json::json!(0.0)),
            ("cityLon", serde_json::json!(0.0)),
        ],
    }
}

/// Decodes the state of the slot `slot_id`.
fn slot_update(json: &Value, owner: OwnerId, slot_id: SlotId) -> Result<SlotUpdate> {
    if json.get("x").map_or(true, Value::is_null) {
        return Ok(SlotUpdate::Clear(slot_id));
    }

    let position = Point::new(float(json, "x")?, float(json, "y")?);
    let rotation = opt_float(json, "rotation")?.unwrap_or(0.0);

    let mut prism = Prism::new(position, rotation, owner, slot_id);

    if let Some(size) = opt_float(json, "size")? {
        prism = prism.with_size(size).ok_or(JsonError::InvalidSize(size))?;
    }

    prism.anchor = anchor(json)?;
    prism.user_name = string(json, "userName")?.to_owned();

    Ok(SlotUpdate::Set(prism))
}

/// Message slots are named `prismId`, stored slots are named `id`.
fn message_slot(json: &Value) -> Result<SlotId> {
    if json.get("prismId").is_some() {
        slot(json, "prismId")
    } else {
        slot(json, "id").map_err(|e| match e {
            JsonError::Missing(_) => JsonError::Missing("prismId"),
            e => e,
        })
    }
}

pub trait JsonSer {
    /// Serialize `self` into a JSON object.
    fn to_json(&self) -> Value;
}

impl<T: JsonSer> JsonSer for [T] {
    fn to_json(&self) -> Value {
        Value::Array(Vec::from_iter(self.iter().map(T::to_json)))
    }
}

impl<const N: usize, T: JsonSer> JsonSer for [T; N] {
    fn to_json(&self) -> Value {
        self.as_slice().to_json()
    }
}

impl<T: JsonSer> JsonSer for Vec<T> {
    fn to_json(&self) -> Value {
        self.as_slice().to_json()
    }
}

impl<T: JsonSer> JsonSer for Option<T> {
    fn to_json(&self) -> Value {
        self.as_ref().map_or(Value::Null, T::to_json)
    }
}

impl<'a, T: JsonSer + ?Sized> JsonSer for &'a T {
    fn to_json(&self) -> Value {
        (*self).to_json()
    }
}

pub trait JsonDes {
    /// Deserialize from a JSON object.
    ///
    /// Returns an error if `json`'s format or values are invalid.
    fn from_json(json: &Value) -> Result<Self>
    where
        Self: Sized;
}

impl JsonSer for Prism {
    /// Serialize a prism into a relay message.
    ///
    /// The format of the returned object is explained in [`Self::from_json`]
    fn to_json(&self) -> Value {
        let mut json = serde_json::json!({
            "userId": self.owner.as_str(),
            "prismId": self.slot.index(),
            "x": self.position.x,
            "y": self.position.y,
            "rotation": self.rotation,
            "size": self.size(),
            "userName": self.user_name,
        });

        if let Value::Object(map) = &mut json {
            for (key, value) in anchor_fields(self.anchor.as_ref()) {
                map.insert(key.into(), value);
            }
        }

        json
    }
}

impl JsonDes for Prism {
    /// Deserialize a prism from a relay message.
    ///
    /// The JSON object must follow the following format:
    ///
    /// ```json
    /// {
    ///     "userId": "k3Jd9...",     // the owner's id
    ///     "prismId": 3,             // the slot, in 0..8 ("id" is also accepted)
    ///     "x": 120.5, "y": 80.0,    // the center, in canvas pixels
    ///     "rotation": -90.0,        // in degrees (optional, defaults to 0)
    ///     "size": 50.0,             // optional, must be positive
    ///     "cityName": "London",     // optional
    ///     "cityLat": 51.5074,       // optional, no anchor if missing
    ///     "cityLon": -0.1278,       // optional, no anchor if missing
    ///     "userName": "Ada",        // optional
    /// }
    /// ```
    fn from_json(json: &Value) -> Result<Self> {
        let owner = json
            .get("userId")
            .ok_or(JsonError::Missing("userId"))?
            .as_str()
            .ok_or(JsonError::Invalid("userId"))?;

        match slot_update(json, OwnerId::new(owner), message_slot(json)?)? {
            SlotUpdate::Set(prism) => Ok(prism),
            SlotUpdate::Clear(_) => Err(JsonError::Missing("x")),
        }
    }
}

impl JsonSer for SlotUpdate {
    fn to_json(&self) -> Value {
        match self {
            SlotUpdate::Set(prism) => prism.to_json(),
            SlotUpdate::Clear(slot) => serde_json::json!({
                "prismId": slot.index(),
                "x": null,
                "y": null,
                "rotation": 0,
            }),
        }
    }
}

impl JsonDes for SlotUpdate {
    /// Same format as [`Prism::from_json`], except a `null` (or missing) `x`
    /// clears the slot, and `userId` may be missing, since the slot set the
    /// update is applied to owns whatever it stores.
    fn from_json(json: &Value) -> Result<Self> {
        let owner = string(json, "userId")?;
        slot_update(json, OwnerId::new(owner), message_slot(json)?)
    }
}

/// Serialize one slot the way the relay stores it, `x` and `y` being `null` for empty slots.
fn stored_slot_to_json(slot: SlotId, prism: Option<&Prism>) -> Value {
    let Some(prism) = prism else {
        return serde_json::json!({
            "id": slot.index(),
            "x": null,
            "y": null,
            "rotation": 0,
            "cityName": "",
            "cityLat": 0,
            "cityLon": 0,
            "userName": "",
        });
    };

    let mut json = prism.to_json();

    if let Value::Object(map) = &mut json {
        map.remove("userId");
        map.remove("prismId");
        map.insert("id".into(), slot.index().into());
    }

    json
}

impl JsonSer for PrismSlots {
    /// Serialize a user's record, `{ "prisms": [slot; 8] }`.
    fn to_json(&self) -> Value {
        serde_json::json!({
            "prisms": Vec::from_iter(SlotId::all().map(|s| stored_slot_to_json(s, self.get(s)))),
        })
    }
}

/// Deserialize the record of the user `owner`, in the format produced by
/// [`PrismSlots::to_json`].
///
/// Slots without an `id` take their index in the array.
pub fn slots_from_json(owner: OwnerId, json: &Value) -> Result<PrismSlots> {
    let entries = json
        .get("prisms")
        .ok_or(JsonError::Missing("prisms"))?
        .as_array()
        .ok_or(JsonError::Invalid("prisms"))?;

    if entries.len() > MAX_PRISMS {
        return Err(JsonError::TooManySlots);
    }

    let mut slots = PrismSlots::new(owner);

    for (i, entry) in entries.iter().enumerate() {
        let slot_id = if entry.get("id").is_some() {
            slot(entry, "id")?
        } else {
            SlotId::new(i).ok_or(JsonError::TooManySlots)?
        };

        slots.apply_update(slot_update(entry, slots.owner().clone(), slot_id)?);
    }

    Ok(slots)
}

impl JsonSer for SunPosition {
    fn to_json(&self) -> Value {
        serde_json::json!({
            "elevation": self.elevation,
            "azimuth": self.azimuth,
        })
    }
}

impl JsonSer for SunTimes {
    /// `{ "sunrise": "2024-06-21T03:43:00.000Z", "sunset": null }`
    fn to_json(&self) -> Value {
        let time = |t: &Option<DateTime<Utc>>| t.as_ref().map_or(Value::Null, instant_to_json);

        serde_json::json!({
            "sunrise": time(&self.sunrise),
            "sunset": time(&self.sunset),
        })
    }
}

impl JsonSer for SpectralRay {
    fn to_json(&self) -> Value {
        serde_json::json!({
            "band": self.band.name,
            "hue": self.hue(),
            "angle": self.exit_angle,
            "entryPt": point_to_json(&self.entry),
            "exitPt": point_to_json(&self.exit),
        })
    }
}

impl JsonSer for Illumination {
    fn to_json(&self) -> Value {
        let state = match self {
            Illumination::Outline => "outline",
            Illumination::Night(_) => "night",
            Illumination::Lit { .. } => "lit",
        };

        serde_json::json!({
            "state": state,
            "sun": self.sun().to_json(),
            "rays": self.rays().to_json(),
        })
    }
}

/// Serialize what `prism` looks like, with the length of its beams if it is lit
/// and `beam_length` is provided.
pub fn serialize_frame(
    prism: &Prism,
    illumination: &Illumination,
    beam_length: Option<Float>,
) -> Value {
    let mut json = illumination.to_json();

    if let Value::Object(map) = &mut json {
        map.insert("userId".into(), prism.owner.as_str().into());
        map.insert("prismId".into(), prism.slot.index().into());

        if let (Illumination::Lit { .. }, Some(length)) = (illumination, beam_length) {
            map.insert("beamLength".into(), length.into());
        }
    }

    json
}

pub fn serialize_scene<'a>(
    instant: &DateTime<Utc>,
    users: impl IntoIterator<Item = &'a PrismSlots>,
) -> Value {
    let users = serde_json::Map::from_iter(
        users
            .into_iter()
            .map(|slots| (slots.owner().to_string(), slots.to_json())),
    );

    serde_json::json!({
        "instant": instant_to_json(instant),
        "users": users,
    })
}

/// Deserialize a scene, `{ "instant": "<RFC 3339>", "users": { "<id>": { "prisms": [...] } } }`.
///
/// `instant` is optional.
pub fn deserialize_scene(json: &Value) -> Result<(Option<DateTime<Utc>>, Vec<PrismSlots>)> {
    let instant = match json.get("instant") {
        None | Some(Value::Null) => None,
        Some(value) => Some(parse_instant(
            value.as_str().ok_or(JsonError::Invalid("instant"))?,
        )?),
    };

    let users = json
        .get("users")
        .ok_or(JsonError::Missing("users"))?
        .as_object()
        .ok_or(JsonError::Invalid("users"))?
        .iter()
        .map(|(owner, record)| slots_from_json(OwnerId::new(owner.as_str()), record))
        .collect::<Result<_>>()?;

    Ok((instant, users))
}

pub fn read_scene(reader: impl io::Read) -> Result<(Option<DateTime<Utc>>, Vec<PrismSlots>)> {
    let json: Value = serde_json::from_reader(reader)?;
    deserialize_scene(&json)
}

#[cfg(test)]
mod tests {
    use refract::chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn relayed_update() -> Value {
        json!({
            "userId": "Yq3kP0",
            "prismId": 2,
            "x": 310.5,
            "y": 120.0,
            "rotation": -75.0,
            "cityName": "London",
            "cityLat": 51.5074,
            "cityLon": -0.1278,
            "userName": "Ada",
            "locationIndex": 4,
        })
    }

    #[test]
    fn reads_relayed_prism_updates() {
        let prism = Prism::from_json(&relayed_update()).unwrap();

        assert_eq!(prism.owner.as_str(), "Yq3kP0");
        assert_eq!(prism.slot.index(), 2);
        assert_eq!(prism.center(), Point::new(310.5, 120.0));
        assert_eq!(prism.rotation, -75.0);
        assert_eq!(prism.size(), PRISM_SIZE);
        assert_eq!(prism.user_name, "Ada");

        let anchor = prism.anchor.unwrap();
        assert_eq!(anchor.city, "London");
        assert_eq!((anchor.latitude, anchor.longitude), (51.5074, -0.1278));
    }

    #[test]
    fn null_position_clears_the_slot() {
        let deletion = json!({ "prismId": 5, "x": null, "y": null, "rotation": 0 });

        let update = SlotUpdate::from_json(&deletion).unwrap();
        assert_eq!(update, SlotUpdate::Clear(SlotId::new(5).unwrap()));
        assert_eq!(update.to_json(), deletion);

        assert!(matches!(
            Prism::from_json(&json!({ "userId": "a", "prismId": 5, "x": null })),
            Err(JsonError::Missing("x"))
        ));
    }

    #[test]
    fn placeholder_anchors_are_no_anchor() {
        let mut msg = relayed_update();
        msg["cityName"] = json!("");
        msg["cityLat"] = json!(0);
        msg["cityLon"] = json!(0);
        assert_eq!(Prism::from_json(&msg).unwrap().anchor, None);

        let mut msg = relayed_update();
        msg.as_object_mut().unwrap().remove("cityLon");
        assert_eq!(Prism::from_json(&msg).unwrap().anchor, None);

        // a real place on the equator keeps its anchor
        let mut msg = relayed_update();
        msg["cityName"] = json!("Quito");
        msg["cityLat"] = json!(0.0);
        assert!(Prism::from_json(&msg).unwrap().anchor.is_some());
    }

    #[test]
    fn rejects_invalid_messages() {
        let mut msg = relayed_update();
        msg["prismId"] = json!(9);
        let err = Prism::from_json(&msg).unwrap_err();
        assert!(matches!(err, JsonError::SlotOutOfRange(9)));
        assert_eq!(err.to_string(), "slot 9 is out of range, there are only 8 slots");
        assert_eq!(
            JsonError::TooManySlots.to_string(),
            "a user cannot have more than 8 slots"
        );

        let mut msg = relayed_update();
        msg.as_object_mut().unwrap().remove("userId");
        assert!(matches!(Prism::from_json(&msg), Err(JsonError::Missing("userId"))));

        let mut msg = relayed_update();
        msg["size"] = json!(-3.0);
        assert!(matches!(Prism::from_json(&msg), Err(JsonError::InvalidSize(_))));

        let mut msg = relayed_update();
        msg["x"] = json!("left");
        assert!(matches!(Prism::from_json(&msg), Err(JsonError::Invalid("x"))));

        let mut msg = relayed_update();
        msg.as_object_mut().unwrap().remove("prismId");
        assert!(matches!(Prism::from_json(&msg), Err(JsonError::Missing("prismId"))));
    }

    #[test]
    fn stored_slots_round_trip() {
        let mut slots = PrismSlots::new(OwnerId::new("Yq3kP0"));
        let anchor = GeoAnchor::new(35.5, 139.75).with_city("Tokyo");
        slots.place([10.5, 20.0], Some(anchor), "Ada");
        slots.apply(
            Prism::new([300.0, 40.0], 12.0, OwnerId::default(), SlotId::new(6).unwrap())
                .with_size(80.0)
                .unwrap(),
        );
        slots.deselect();

        let json = slots.to_json();
        let entries = json["prisms"].as_array().unwrap();
        assert_eq!(entries.len(), MAX_PRISMS);
        assert_eq!(entries[0]["cityName"], "Tokyo");
        assert_eq!(entries[0]["id"], 0);
        assert!(entries[0].get("userId").is_none());
        assert!(entries[1]["x"].is_null());

        let decoded = slots_from_json(OwnerId::new("Yq3kP0"), &json).unwrap();
        assert_eq!(decoded, slots);
    }

    #[test]
    fn stored_slots_without_ids_use_their_index() {
        let record = json!({ "prisms": [
            { "x": null, "y": null },
            { "x": 1.0, "y": 2.0, "rotation": 30.0 },
        ]});

        let slots = slots_from_json(OwnerId::new("u"), &record).unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots.get(SlotId::new(1).unwrap()).unwrap().rotation, 30.0);

        let too_many = json!({ "prisms": vec![json!({ "x": null }); MAX_PRISMS + 1] });
        assert!(matches!(
            slots_from_json(OwnerId::new("u"), &too_many),
            Err(JsonError::TooManySlots)
        ));
    }

    #[test]
    fn scenes_carry_their_instant() {
        let instant = Utc.with_ymd_and_hms(2024, 6, 21, 12, 0, 0).unwrap();
        let mut alice = PrismSlots::new(OwnerId::new("alice"));
        alice.place([100.0, 100.0], None, "Alice");
        alice.deselect();

        let json = serialize_scene(&instant, [&alice]);
        assert_eq!(json["instant"], "2024-06-21T12:00:00.000Z");

        let (decoded_instant, users) = deserialize_scene(&json).unwrap();
        assert_eq!(decoded_instant, Some(instant));
        assert_eq!(users, vec![alice]);

        let bad = json!({ "instant": "yesterday", "users": {} });
        assert!(matches!(deserialize_scene(&bad), Err(JsonError::Timestamp(_))));

        let no_instant = json!({ "users": {} });
        assert!(matches!(deserialize_scene(&no_instant), Ok((None, users)) if users.is_empty()));

        assert!(matches!(read_scene(&b"{ \"users\": "[..]), Err(JsonError::Syntax(_))));
    }

    #[test]
    fn frames_describe_each_state() {
        let prism = Prism::new([0.0, 0.0], DEFAULT_ROTATION, OwnerId::new("bob"), SlotId::FIRST);

        let outline = serialize_frame(&prism, &Illumination::Outline, Some(500.0));
        assert_eq!(outline["state"], "outline");
        assert!(outline["sun"].is_null());
        assert_eq!(outline["rays"], json!([]));
        assert!(outline.get("beamLength").is_none());
        assert_eq!(outline["userId"], "bob");

        let sun = SunPosition {
            elevation: 20.0,
            azimuth: 105.0,
        };
        let lit = Illumination::Lit {
            sun,
            rays: prism.dispersion(sun.canvas_heading()),
        };

        let frame = serialize_frame(&prism, &lit, Some(500.0));
        assert_eq!(frame["state"], "lit");
        assert_eq!(frame["sun"]["azimuth"], 105.0);
        assert_eq!(frame["beamLength"], 500.0);

        let rays = frame["rays"].as_array().unwrap();
        assert_eq!(rays.len(), lit.rays().len());
        assert_eq!(rays[0]["band"], "red");
        assert_eq!(rays[0]["entryPt"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn sun_times_may_be_null() {
        let rise = Utc.with_ymd_and_hms(2024, 3, 20, 6, 8, 0).unwrap();
        let times = SunTimes {
            sunrise: Some(rise),
            sunset: None,
        };

        assert_eq!(
            times.to_json(),
            json!({ "sunrise": "2024-03-20T06:08:00.000Z", "sunset": null })
        );
    }
}
