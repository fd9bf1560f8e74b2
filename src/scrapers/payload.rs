//! Shapes of the `__NEXT_DATA__` JSON embedded in otodom pages.
//!
//! Only the fields the scout reads are modelled; everything else is ignored.

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct NextData<P> {
    pub props: Props<P>,
}

#[derive(Debug, Deserialize)]
pub struct Props<P> {
    #[serde(rename = "pageProps")]
    pub page_props: P,
}

// ---------------------------------------------------------------------------
// Search results page
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SearchPageProps {
    #[serde(default)]
    pub data: SearchData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchData {
    #[serde(default)]
    pub search_ads: AdSlice,
    #[serde(default)]
    pub search_ads_random_promoted: AdSlice,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdSlice {
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<SearchItem>,
}

/// One entry of a results slice.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItem {
    pub id: u64,
    #[serde(default)]
    pub slug: String,
    pub title: Option<String>,
    pub area_in_square_meters: Option<f64>,
    #[serde(default)]
    pub hide_price: bool,
    pub location_label: Option<LabelValue>,
    pub total_price: Option<PriceValue>,
    pub date_created: Option<String>,
    pub pushed_up_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabelValue {
    pub value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceValue {
    pub value: Option<f64>,
}

// ---------------------------------------------------------------------------
// Offer page
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct OfferPageProps {
    pub ad: Option<OfferAd>,
}

#[derive(Debug, Deserialize)]
pub struct OfferAd {
    /// Loosely typed key/value attributes (`Rooms_num`, `Build_year`, ...).
    #[serde(default)]
    pub target: Map<String, Value>,
}

/// Fields only the offer page carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OfferDetails {
    pub room_count: Option<u32>,
    pub has_garage: bool,
    pub build_year: Option<i32>,
}

impl OfferDetails {
    /// Reads what it can from an offer's `target` map; missing or oddly typed
    /// attributes are simply absent.
    pub fn from_target(target: &Map<String, Value>) -> Self {
        let room_count = target
            .get("Rooms_num")
            .and_then(first_value)
            .and_then(as_integer)
            .and_then(|n| u32::try_from(n).ok());
        let has_garage = target
            .get("Extras_types")
            .and_then(Value::as_array)
            .is_some_and(|extras| extras.iter().any(|v| v.as_str() == Some("garage")));
        let build_year = target
            .get("Build_year")
            .and_then(first_value)
            .and_then(as_integer)
            .and_then(|n| i32::try_from(n).ok());

        Self {
            room_count,
            has_garage,
            build_year,
        }
    }
}

fn first_value(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(values) => values.first(),
        other => Some(other),
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
