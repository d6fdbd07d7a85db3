use chrono::Utc;
use serde_json::{Map, Value};

use crate::config::AemConfig;
use crate::models::NormalizedMetadata;

/// Status fields checked for an approval indicator, in precedence order.
pub const STATUS_FIELDS: [&str; 5] = [
    "dam:status",
    "status",
    "approvalStatus",
    "reviewStatus",
    "workflowStatus",
];

const APPROVED_VALUES: [&str; 2] = ["approved", "published"];

const TAG_FIELDS: [&str; 2] = ["cq:tags", "dam:tags"];
const CATEGORY_FIELDS: [&str; 2] = ["cq:categories", "categories"];
const KEYWORD_FIELDS: [&str; 2] = ["dc:subject", "keywords"];

/// Repository-internal namespaces never copied into custom metadata.
const RESERVED_PREFIXES: [&str; 2] = ["jcr:", "cq:"];

/// Source keys consumed by the fixed schema mapping. Anything else (outside
/// the reserved namespaces) passes through as custom metadata.
const STANDARD_KEYS: [&str; 45] = [
    "jcr:uuid",
    "dam:assetId",
    "dc:format",
    "dam:size",
    "tiff:ImageWidth",
    "tiff:ImageLength",
    "dc:title",
    "dc:description",
    "dam:altText",
    "cq:tags",
    "dam:tags",
    "cq:categories",
    "categories",
    "dc:subject",
    "keywords",
    "dam:brand",
    "brand",
    "dam:campaign",
    "campaign",
    "dam:productType",
    "productType",
    "dam:usage",
    "usage",
    "dam:status",
    "status",
    "approvalStatus",
    "reviewStatus",
    "workflowStatus",
    "dam:publishStatus",
    "publishStatus",
    "dam:workflowStatus",
    "jcr:created",
    "dam:createdDate",
    "jcr:lastModified",
    "cq:lastModified",
    "tiff:ColorSpace",
    "dam:colorSpace",
    "tiff:XResolution",
    "dam:resolution",
    "dc:rights",
    "copyright",
    "license",
    "xmpRights:UsageTerms",
    "dc:creator",
    "creator",
];

/// Maps AEM asset metadata into the MLE ingestion schema. Pure: no network
/// or disk access, every input is already in memory.
#[derive(Clone)]
pub struct MetadataTransformer {
    aem: AemConfig,
}

impl MetadataTransformer {
    pub fn new(aem: AemConfig) -> Self {
        Self { aem }
    }

    pub fn transform(
        &self,
        metadata: &Map<String, Value>,
        asset_path: &str,
        event_type: &str,
    ) -> NormalizedMetadata {
        let file_name = last_path_segment(asset_path);
        let file_stem = strip_extension(&file_name);

        let mime_type = str_field(metadata, &["dc:format"])
            .or_else(|| extension_of(&file_name).map(|ext| mime_for_extension(&ext).to_string()));
        let media_type = media_type_for(mime_type.as_deref());

        let width = u64_field(metadata, &["tiff:ImageWidth"]);
        let height = u64_field(metadata, &["tiff:ImageLength"]);

        NormalizedMetadata {
            asset_id: derive_asset_id(metadata, asset_path),
            asset_path: asset_path.to_string(),
            asset_url: join_url(&self.aem.author_url, asset_path),
            public_url: join_url(&self.aem.publish_url, asset_path),

            media_type,
            mime_type,
            file_size: u64_field(metadata, &["dam:size"]),
            file_name: file_name.clone(),

            width,
            height,

            title: str_field(metadata, &["dc:title"]).unwrap_or_else(|| file_stem.clone()),
            description: str_field(metadata, &["dc:description"]),
            alt_text: str_field(metadata, &["dam:altText", "dc:title"]),

            tags: union_fields(metadata, &TAG_FIELDS),
            categories: union_fields(metadata, &CATEGORY_FIELDS),
            keywords: union_fields(metadata, &KEYWORD_FIELDS),

            brand: str_field(metadata, &["dam:brand", "brand"]),
            campaign: str_field(metadata, &["dam:campaign", "campaign"]),
            product_type: str_field(metadata, &["dam:productType", "productType"]),
            usage: str_field(metadata, &["dam:usage", "usage"]),

            approval_status: if is_approved(metadata) {
                "approved".to_string()
            } else {
                "pending".to_string()
            },
            publish_status: str_field(metadata, &["dam:publishStatus", "publishStatus"])
                .unwrap_or_else(|| "unpublished".to_string()),
            workflow_status: str_field(metadata, &["dam:workflowStatus", "workflowStatus"]),

            created_date: str_field(metadata, &["jcr:created", "dam:createdDate"]),
            modified_date: str_field(metadata, &["jcr:lastModified", "cq:lastModified"]),
            published_date: Utc::now().to_rfc3339(),

            color_space: str_field(metadata, &["tiff:ColorSpace", "dam:colorSpace"]),
            resolution: str_field(metadata, &["tiff:XResolution", "dam:resolution"]),
            orientation: orientation_for(width, height),

            copyright: str_field(metadata, &["dc:rights", "copyright"]),
            license: str_field(metadata, &["license", "xmpRights:UsageTerms"]),
            creator: str_field(metadata, &["dc:creator", "creator"]),

            event_type: event_type.to_string(),
            source_system: "AEM".to_string(),

            custom_metadata: custom_metadata(metadata),
        }
    }
}

/// True when any status field carries an approval indicator. Shared between
/// the transformer and the processor's approval gate so both see the same
/// fields in the same order.
pub fn is_approved(metadata: &Map<String, Value>) -> bool {
    STATUS_FIELDS.iter().any(|field| {
        value_to_string(metadata.get(*field).unwrap_or(&Value::Null))
            .map(|v| {
                APPROVED_VALUES
                    .iter()
                    .any(|approved| v.eq_ignore_ascii_case(approved))
            })
            .unwrap_or(false)
    })
}

/// Explicit unique identifier when the source provides one, otherwise the
/// final path segment with its extension stripped.
pub fn derive_asset_id(metadata: &Map<String, Value>, asset_path: &str) -> String {
    str_field(metadata, &["jcr:uuid", "dam:assetId"])
        .unwrap_or_else(|| strip_extension(&last_path_segment(asset_path)))
}

fn last_path_segment(path: &str) -> String {
    path.rsplit('/').next().unwrap_or_default().to_string()
}

fn strip_extension(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => file_name.to_string(),
    }
}

fn extension_of(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

fn mime_for_extension(extension: &str) -> &'static str {
    match extension {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

fn media_type_for(mime_type: Option<&str>) -> String {
    let mime = match mime_type {
        Some(mime) => mime,
        None => return "unknown".to_string(),
    };
    if mime.starts_with("image/") {
        "image"
    } else if mime.starts_with("video/") {
        "video"
    } else if mime.starts_with("audio/") {
        "audio"
    } else if mime.contains("pdf") {
        "document"
    } else if mime.starts_with("text/") {
        "text"
    } else {
        "other"
    }
    .to_string()
}

fn orientation_for(width: Option<u64>, height: Option<u64>) -> Option<String> {
    match (width, height) {
        (Some(w), Some(h)) if w > h => Some("landscape".to_string()),
        (Some(w), Some(h)) if w < h => Some("portrait".to_string()),
        (Some(_), Some(_)) => Some("square".to_string()),
        _ => None,
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

fn str_field(metadata: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| metadata.get(*key).and_then(value_to_string))
}

fn u64_field(metadata: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|key| {
        let value = metadata.get(*key)?;
        value
            .as_u64()
            .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
    })
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Union of the given source fields, each holding a scalar or a sequence,
/// deduplicated preserving first occurrence.
fn union_fields(metadata: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    let mut values = Vec::new();
    for key in keys {
        match metadata.get(*key) {
            Some(Value::Array(items)) => {
                for item in items {
                    if let Some(value) = value_to_string(item) {
                        if !values.contains(&value) {
                            values.push(value);
                        }
                    }
                }
            }
            Some(other) => {
                if let Some(value) = value_to_string(other) {
                    if !values.contains(&value) {
                        values.push(value);
                    }
                }
            }
            None => {}
        }
    }
    values
}

fn custom_metadata(metadata: &Map<String, Value>) -> Map<String, Value> {
    metadata
        .iter()
        .filter(|(key, _)| {
            !STANDARD_KEYS.contains(&key.as_str())
                && !RESERVED_PREFIXES
                    .iter()
                    .any(|prefix| key.starts_with(prefix))
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
