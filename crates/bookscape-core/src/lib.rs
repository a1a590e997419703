//! Raw volume model and field normalization for BookScape.

use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

pub const CRATE_NAME: &str = "bookscape-core";

/// Sentinel stored wherever the source payload carries no usable value.
pub const NOT_AVAILABLE: &str = "Not Available";

/// Lenient decoders for the volumes payload. Every field of a volume is
/// optional and loosely typed upstream; a field of the wrong JSON type
/// decodes to `None` instead of failing the item.
pub mod lenient {
    use super::*;
    use serde::de::DeserializeOwned;

    pub fn coerce_string(value: JsonValue) -> Option<String> {
        match value {
            JsonValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn coerce_string_list(value: JsonValue) -> Option<Vec<String>> {
        match value {
            JsonValue::Array(items) => Some(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        JsonValue::String(s) => Some(s),
                        _ => None,
                    })
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Numbers only. Booleans, strings, null, and structures are not ints;
    /// fractional values truncate.
    pub fn coerce_int(value: &JsonValue) -> Option<i64> {
        match value {
            JsonValue::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            _ => None,
        }
    }

    pub fn coerce_float(value: &JsonValue) -> Option<f64> {
        match value {
            JsonValue::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Strictly JSON `true` / `false`; `"true"` and `1` do not count.
    pub fn coerce_bool(value: &JsonValue) -> Option<bool> {
        match value {
            JsonValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(coerce_string(JsonValue::deserialize(deserializer)?))
    }

    pub fn string_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(coerce_string_list(JsonValue::deserialize(deserializer)?))
    }

    pub fn int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(coerce_int(&JsonValue::deserialize(deserializer)?))
    }

    pub fn float<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(coerce_float(&JsonValue::deserialize(deserializer)?))
    }

    pub fn boolean<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(coerce_bool(&JsonValue::deserialize(deserializer)?))
    }

    /// Keeps the raw structure as-is; JSON null counts as absent.
    pub fn structure<'de, D>(deserializer: D) -> Result<Option<JsonValue>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match JsonValue::deserialize(deserializer)? {
            JsonValue::Null => None,
            other => Some(other),
        })
    }

    /// Nested bag decode: an object goes through `T`'s own lenient fields,
    /// anything else collapses the whole bag to `None`.
    pub fn nested<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let value = JsonValue::deserialize(deserializer)?;
        Ok(if value.is_object() {
            serde_json::from_value(value).ok()
        } else {
            None
        })
    }

    /// Sequence decode that drops elements which are not objects.
    pub fn object_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(match JsonValue::deserialize(deserializer)? {
            JsonValue::Array(items) => Some(
                items
                    .into_iter()
                    .filter(|item| item.is_object())
                    .filter_map(|item| serde_json::from_value(item).ok())
                    .collect(),
            ),
            _ => None,
        })
    }
}

/// One decoded search response. A payload without a usable `items` array is
/// a page with zero items, not an error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumesPage {
    #[serde(default, deserialize_with = "lenient::int")]
    pub total_items: Option<i64>,
    #[serde(default, deserialize_with = "lenient::object_list")]
    pub items: Option<Vec<RawVolume>>,
}

impl VolumesPage {
    pub fn items_or_empty(&self) -> &[RawVolume] {
        self.items.as_deref().unwrap_or_default()
    }
}

/// One unnormalized catalog entry as returned by the search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawVolume {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::nested")]
    pub volume_info: Option<VolumeInfo>,
}

impl RawVolume {
    /// Natural key used for deduplication: the source id, or the sentinel
    /// when the payload carries none.
    pub fn book_id(&self) -> String {
        text_or_default(self.id.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeInfo {
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub subtitle: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub authors: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::structure")]
    pub industry_identifiers: Option<JsonValue>,
    #[serde(default, deserialize_with = "lenient::nested")]
    pub reading_modes: Option<ReadingModes>,
    #[serde(default, deserialize_with = "lenient::int")]
    pub page_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub categories: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub language: Option<String>,
    #[serde(default, deserialize_with = "lenient::structure")]
    pub image_links: Option<JsonValue>,
    #[serde(default, deserialize_with = "lenient::int")]
    pub ratings_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub average_rating: Option<f64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub published_date: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub publisher: Option<String>,
    #[serde(default, deserialize_with = "lenient::nested")]
    pub sale_info: Option<SaleInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReadingModes {
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub text: Option<bool>,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub image: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleInfo {
    #[serde(default, deserialize_with = "lenient::string")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub saleability: Option<String>,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub is_ebook: Option<bool>,
    #[serde(default, deserialize_with = "lenient::nested")]
    pub list_price: Option<Price>,
    #[serde(default, deserialize_with = "lenient::nested")]
    pub retail_price: Option<Price>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub buy_link: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    #[serde(default, deserialize_with = "lenient::float")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub currency_code: Option<String>,
}

/// Flattened row shape persisted to the `books` table.
#[derive(Debug, Clone, PartialEq)]
pub struct BookRow {
    pub book_id: String,
    pub search_key: String,
    pub book_title: String,
    pub book_subtitle: String,
    pub book_authors: String,
    pub book_description: String,
    pub industry_identifiers: String,
    pub text_reading_modes: String,
    pub image_reading_modes: String,
    pub page_count: i64,
    pub categories: String,
    pub language: String,
    pub image_links: String,
    pub ratings_count: i64,
    pub average_rating: f64,
    pub country: String,
    pub saleability: String,
    pub is_ebook: i16,
    pub amount_list_price: f64,
    pub currency_code_list_price: String,
    pub amount_retail_price: f64,
    pub currency_code_retail_price: String,
    pub buy_link: String,
    pub year: String,
    pub publisher: String,
}

/// The value when present and non-empty, the sentinel otherwise.
pub fn text_or_default(value: Option<&str>) -> String {
    match value {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Lists join with `", "`; no list, or a join that comes out empty, gets
/// the sentinel.
pub fn join_or_default(values: Option<&[String]>) -> String {
    match values {
        Some(items) => text_or_default(Some(&items.join(", "))),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Opaque structures persist as their compact JSON rendering.
pub fn stringify_or_default(value: Option<&JsonValue>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Reading-mode flags render as `"true"` / `"false"`; a present `false`
/// survives rather than collapsing to the sentinel.
pub fn flag_or_default(value: Option<bool>) -> String {
    match value {
        Some(flag) => flag.to_string(),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Strict-true collapse for the ebook flag: only JSON `true` maps to 1.
pub fn ebook_flag(value: Option<bool>) -> i16 {
    match value {
        Some(true) => 1,
        _ => 0,
    }
}

/// Flattens one raw volume into its persisted row. Total: any combination
/// of missing or malformed fields produces a row of defaults.
pub fn normalize(volume: &RawVolume, search_key: &str) -> BookRow {
    let info = volume.volume_info.clone().unwrap_or_default();
    let modes = info.reading_modes.clone().unwrap_or_default();
    let sale = info.sale_info.clone().unwrap_or_default();
    let list_price = sale.list_price.clone().unwrap_or_default();
    let retail_price = sale.retail_price.clone().unwrap_or_default();

    BookRow {
        book_id: volume.book_id(),
        search_key: search_key.to_string(),
        book_title: text_or_default(info.title.as_deref()),
        book_subtitle: text_or_default(info.subtitle.as_deref()),
        book_authors: join_or_default(info.authors.as_deref()),
        book_description: text_or_default(info.description.as_deref()),
        industry_identifiers: stringify_or_default(info.industry_identifiers.as_ref()),
        text_reading_modes: flag_or_default(modes.text),
        image_reading_modes: flag_or_default(modes.image),
        page_count: info.page_count.unwrap_or(0),
        categories: join_or_default(info.categories.as_deref()),
        language: text_or_default(info.language.as_deref()),
        image_links: stringify_or_default(info.image_links.as_ref()),
        ratings_count: info.ratings_count.unwrap_or(0),
        average_rating: info.average_rating.unwrap_or(0.0),
        country: text_or_default(sale.country.as_deref()),
        saleability: text_or_default(sale.saleability.as_deref()),
        is_ebook: ebook_flag(sale.is_ebook),
        amount_list_price: list_price.amount.unwrap_or(0.0),
        currency_code_list_price: text_or_default(list_price.currency_code.as_deref()),
        amount_retail_price: retail_price.amount.unwrap_or(0.0),
        currency_code_retail_price: text_or_default(retail_price.currency_code.as_deref()),
        buy_link: text_or_default(sale.buy_link.as_deref()),
        year: text_or_default(info.published_date.as_deref()),
        publisher: text_or_default(info.publisher.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn volume_from(value: serde_json::Value) -> RawVolume {
        serde_json::from_value(value).expect("volume decodes")
    }

    #[test]
    fn numeric_coercion_accepts_only_numbers() {
        assert_eq!(lenient::coerce_int(&json!(412)), Some(412));
        assert_eq!(lenient::coerce_int(&json!(0)), Some(0));
        assert_eq!(lenient::coerce_int(&json!(-3)), Some(-3));
        assert_eq!(lenient::coerce_int(&json!(412.9)), Some(412));
        assert_eq!(lenient::coerce_int(&json!(true)), None);
        assert_eq!(lenient::coerce_int(&json!("412")), None);
        assert_eq!(lenient::coerce_int(&json!(null)), None);
        assert_eq!(lenient::coerce_int(&json!({"n": 412})), None);

        assert_eq!(lenient::coerce_float(&json!(4.5)), Some(4.5));
        assert_eq!(lenient::coerce_float(&json!(0)), Some(0.0));
        assert_eq!(lenient::coerce_float(&json!(false)), None);
        assert_eq!(lenient::coerce_float(&json!("4.5")), None);
        assert_eq!(lenient::coerce_float(&json!([4.5])), None);
    }

    #[test]
    fn zero_and_negative_numbers_survive_normalization() {
        let volume = volume_from(json!({
            "id": "v0",
            "volumeInfo": {"pageCount": 0, "ratingsCount": -1, "averageRating": 0.0}
        }));
        let row = normalize(&volume, "q");
        assert_eq!(row.page_count, 0);
        assert_eq!(row.ratings_count, -1);
        assert_eq!(row.average_rating, 0.0);
    }

    #[test]
    fn ebook_flag_is_strict_true_only() {
        assert_eq!(ebook_flag(Some(true)), 1);
        assert_eq!(ebook_flag(Some(false)), 0);
        assert_eq!(ebook_flag(None), 0);

        // "true" and 1 are not booleans, so they decode to None upstream.
        assert_eq!(lenient::coerce_bool(&json!("true")), None);
        assert_eq!(lenient::coerce_bool(&json!(1)), None);

        let volume = volume_from(json!({
            "volumeInfo": {"saleInfo": {"isEbook": "true"}}
        }));
        assert_eq!(normalize(&volume, "q").is_ebook, 0);
    }

    #[test]
    fn author_and_category_lists_join_with_comma_space() {
        let volume = volume_from(json!({
            "volumeInfo": {
                "authors": ["A. Author", "B. Writer"],
                "categories": []
            }
        }));
        let row = normalize(&volume, "q");
        assert_eq!(row.book_authors, "A. Author, B. Writer");
        assert_eq!(row.categories, NOT_AVAILABLE);

        let missing = normalize(&volume_from(json!({})), "q");
        assert_eq!(missing.book_authors, NOT_AVAILABLE);
    }

    #[test]
    fn non_string_list_entries_are_dropped() {
        let volume = volume_from(json!({
            "volumeInfo": {"authors": ["A. Author", 7, null, "B. Writer"]}
        }));
        assert_eq!(normalize(&volume, "q").book_authors, "A. Author, B. Writer");
    }

    #[test]
    fn empty_volume_normalizes_to_all_defaults() {
        let row = normalize(&volume_from(json!({})), "rust");
        assert_eq!(row.book_id, NOT_AVAILABLE);
        assert_eq!(row.search_key, "rust");
        assert_eq!(row.book_title, NOT_AVAILABLE);
        assert_eq!(row.book_subtitle, NOT_AVAILABLE);
        assert_eq!(row.book_authors, NOT_AVAILABLE);
        assert_eq!(row.book_description, NOT_AVAILABLE);
        assert_eq!(row.industry_identifiers, NOT_AVAILABLE);
        assert_eq!(row.text_reading_modes, NOT_AVAILABLE);
        assert_eq!(row.image_reading_modes, NOT_AVAILABLE);
        assert_eq!(row.page_count, 0);
        assert_eq!(row.categories, NOT_AVAILABLE);
        assert_eq!(row.language, NOT_AVAILABLE);
        assert_eq!(row.image_links, NOT_AVAILABLE);
        assert_eq!(row.ratings_count, 0);
        assert_eq!(row.average_rating, 0.0);
        assert_eq!(row.country, NOT_AVAILABLE);
        assert_eq!(row.saleability, NOT_AVAILABLE);
        assert_eq!(row.is_ebook, 0);
        assert_eq!(row.amount_list_price, 0.0);
        assert_eq!(row.currency_code_list_price, NOT_AVAILABLE);
        assert_eq!(row.amount_retail_price, 0.0);
        assert_eq!(row.currency_code_retail_price, NOT_AVAILABLE);
        assert_eq!(row.buy_link, NOT_AVAILABLE);
        assert_eq!(row.year, NOT_AVAILABLE);
        assert_eq!(row.publisher, NOT_AVAILABLE);
    }

    #[test]
    fn full_volume_maps_every_field() {
        let volume = volume_from(json!({
            "id": "zyTCAlFPjgYC",
            "volumeInfo": {
                "title": "The Google Story",
                "subtitle": "Inside the Hottest Business",
                "authors": ["David A. Vise", "Mark Malseed"],
                "description": "The definitive account.",
                "industryIdentifiers": [
                    {"identifier": "055380457X", "type": "ISBN_10"}
                ],
                "readingModes": {"text": true, "image": false},
                "pageCount": 207,
                "categories": ["Business & Economics"],
                "language": "en",
                "imageLinks": {"thumbnail": "http://books.example/thumb"},
                "ratingsCount": 136,
                "averageRating": 3.5,
                "publishedDate": "2005-11-15",
                "publisher": "Random House Digital",
                "saleInfo": {
                    "country": "US",
                    "saleability": "FOR_SALE",
                    "isEbook": true,
                    "listPrice": {"amount": 11.99, "currencyCode": "USD"},
                    "retailPrice": {"amount": 9.99, "currencyCode": "USD"},
                    "buyLink": "http://books.example/buy"
                }
            }
        }));
        let row = normalize(&volume, "google");
        assert_eq!(row.book_id, "zyTCAlFPjgYC");
        assert_eq!(row.search_key, "google");
        assert_eq!(row.book_title, "The Google Story");
        assert_eq!(row.book_subtitle, "Inside the Hottest Business");
        assert_eq!(row.book_authors, "David A. Vise, Mark Malseed");
        assert_eq!(row.book_description, "The definitive account.");
        assert_eq!(
            row.industry_identifiers,
            r#"[{"identifier":"055380457X","type":"ISBN_10"}]"#
        );
        assert_eq!(row.text_reading_modes, "true");
        assert_eq!(row.image_reading_modes, "false");
        assert_eq!(row.page_count, 207);
        assert_eq!(row.categories, "Business & Economics");
        assert_eq!(row.language, "en");
        assert_eq!(row.image_links, r#"{"thumbnail":"http://books.example/thumb"}"#);
        assert_eq!(row.ratings_count, 136);
        assert_eq!(row.average_rating, 3.5);
        assert_eq!(row.country, "US");
        assert_eq!(row.saleability, "FOR_SALE");
        assert_eq!(row.is_ebook, 1);
        assert_eq!(row.amount_list_price, 11.99);
        assert_eq!(row.currency_code_list_price, "USD");
        assert_eq!(row.amount_retail_price, 9.99);
        assert_eq!(row.currency_code_retail_price, "USD");
        assert_eq!(row.buy_link, "http://books.example/buy");
        assert_eq!(row.year, "2005-11-15");
        assert_eq!(row.publisher, "Random House Digital");
    }

    #[test]
    fn mistyped_fields_fall_back_to_defaults() {
        let volume = volume_from(json!({
            "id": 9,
            "volumeInfo": {
                "title": 42,
                "authors": "not a list",
                "pageCount": "412",
                "averageRating": true,
                "readingModes": "none",
                "saleInfo": {"listPrice": {"amount": "9.99"}}
            }
        }));
        let row = normalize(&volume, "q");
        assert_eq!(row.book_id, NOT_AVAILABLE);
        assert_eq!(row.book_title, NOT_AVAILABLE);
        assert_eq!(row.book_authors, NOT_AVAILABLE);
        assert_eq!(row.page_count, 0);
        assert_eq!(row.average_rating, 0.0);
        assert_eq!(row.text_reading_modes, NOT_AVAILABLE);
        assert_eq!(row.amount_list_price, 0.0);
    }

    #[test]
    fn volume_info_of_wrong_type_collapses_whole_bag() {
        let row = normalize(&volume_from(json!({"id": "x", "volumeInfo": 5})), "q");
        assert_eq!(row.book_id, "x");
        assert_eq!(row.book_title, NOT_AVAILABLE);
        assert_eq!(row.page_count, 0);
    }

    #[test]
    fn null_structures_count_as_absent() {
        let volume = volume_from(json!({
            "volumeInfo": {"industryIdentifiers": null, "imageLinks": null}
        }));
        let row = normalize(&volume, "q");
        assert_eq!(row.industry_identifiers, NOT_AVAILABLE);
        assert_eq!(row.image_links, NOT_AVAILABLE);
    }

    #[test]
    fn page_without_items_is_empty_not_an_error() {
        let page: VolumesPage =
            serde_json::from_value(json!({"kind": "books#volumes", "totalItems": 0}))
                .expect("page decodes");
        assert!(page.items_or_empty().is_empty());

        let malformed: VolumesPage =
            serde_json::from_value(json!({"items": "nope"})).expect("page decodes");
        assert!(malformed.items_or_empty().is_empty());
    }

    #[test]
    fn non_object_items_are_skipped() {
        let page: VolumesPage = serde_json::from_value(json!({
            "items": [{"id": "a"}, 17, "junk", ["x"], {"id": "b"}]
        }))
        .expect("page decodes");
        let ids: Vec<_> = page.items_or_empty().iter().map(|v| v.book_id()).collect();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn empty_strings_collapse_to_sentinel() {
        assert_eq!(text_or_default(Some("")), NOT_AVAILABLE);
        assert_eq!(text_or_default(None), NOT_AVAILABLE);
        assert_eq!(text_or_default(Some("kept")), "kept");
        assert_eq!(join_or_default(Some(&[])), NOT_AVAILABLE);
    }
}
