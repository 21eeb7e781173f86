use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Match profile, one per user. Same camelCase shape as [`NewMatchInfo`] on
/// the wire; the MongoDB document layout lives with the Mongo repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchInfo {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    /// Native language
    pub native: String,
    /// Languages the user is learning
    #[serde(default)]
    pub learnings: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub country: Option<String>,
    pub major: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MatchInfo {
    pub fn new(input: NewMatchInfo) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            user_id: input.user_id,
            name: input.name,
            native: input.native,
            learnings: input.learnings,
            interests: input.interests,
            age: input.age,
            gender: input.gender,
            country: input.country,
            major: input.major,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `other` speaks natively, or is learning, a language this
    /// user is learning
    pub fn is_candidate(&self, other: &MatchInfo) -> bool {
        other.user_id != self.user_id
            && self
                .learnings
                .iter()
                .any(|lang| other.native == *lang || other.learnings.contains(lang))
    }
}

/// Payload for creating a match profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewMatchInfo {
    pub user_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 2, max = 16))]
    pub native: String,
    #[serde(default)]
    pub learnings: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[validate(range(min = 0, max = 150))]
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub country: Option<String>,
    pub major: Option<String>,
}

/// Fixed-dimension embedding. Serialized as a bare JSON array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct EmbeddingVector(pub Vec<f32>);

impl EmbeddingVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }

    /// Little-endian FLOAT32 blob, the layout RediSearch expects for
    /// vector query parameters
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.0.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    /// `1 - cos(self, other)`; 1.0 when either vector has zero norm
    pub fn cosine_distance(&self, other: &EmbeddingVector) -> f32 {
        let (mut dot, mut na, mut nb) = (0.0f32, 0.0f32, 0.0f32);
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            dot += a * b;
            na += a * a;
            nb += b * b;
        }
        if na == 0.0 || nb == 0.0 {
            return 1.0;
        }
        1.0 - dot / (na.sqrt() * nb.sqrt())
    }
}

impl From<Vec<f32>> for EmbeddingVector {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// What the explore service needs to know about a user from the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    #[serde(rename = "_id", alias = "id")]
    pub id: Uuid,
    #[serde(default, alias = "friendIds")]
    pub friend_ids: Vec<Uuid>,
}

impl UserRef {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            friend_ids: Vec::new(),
        }
    }

    pub fn with_friends(mut self, friends: impl IntoIterator<Item = Uuid>) -> Self {
        self.friend_ids.extend(friends);
        self
    }
}

/// Body of `PUT /embeddings/{user_id}`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EmbeddingBody {
    pub embed: EmbeddingVector,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_info(user_id: Uuid, native: &str, learnings: &[&str]) -> NewMatchInfo {
        NewMatchInfo {
            user_id,
            name: "Linh".to_string(),
            native: native.to_string(),
            learnings: learnings.iter().map(|s| s.to_string()).collect(),
            interests: vec!["music".to_string()],
            age: Some(21),
            gender: None,
            country: Some("VN".to_string()),
            major: None,
        }
    }

    #[test]
    fn test_new_match_info_wire_shape() {
        let json = serde_json::json!({
            "userId": Uuid::nil(),
            "name": "Linh",
            "native": "vi",
            "learnings": ["en"],
        });
        let parsed: NewMatchInfo = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.learnings, vec!["en"]);
        assert!(parsed.interests.is_empty());
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_empty_name_and_bad_age() {
        let mut input = new_info(Uuid::new_v4(), "vi", &["en"]);
        input.name = String::new();
        input.age = Some(400);

        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("age"));
    }

    #[test]
    fn test_match_info_new_assigns_id_and_timestamps() {
        let user = Uuid::new_v4();
        let info = MatchInfo::new(new_info(user, "en", &["vi"]));

        assert_eq!(info.user_id, user);
        assert_ne!(info.id, user);
        assert_eq!(info.created_at, info.updated_at);
    }

    #[test]
    fn test_is_candidate() {
        let me = MatchInfo::new(new_info(Uuid::new_v4(), "en", &["vi"]));
        let native_vi = MatchInfo::new(new_info(Uuid::new_v4(), "vi", &[]));
        let learning_vi = MatchInfo::new(new_info(Uuid::new_v4(), "fr", &["vi"]));
        let unrelated = MatchInfo::new(new_info(Uuid::new_v4(), "de", &["ja"]));

        assert!(me.is_candidate(&native_vi));
        assert!(me.is_candidate(&learning_vi));
        assert!(!me.is_candidate(&unrelated));
        assert!(!me.is_candidate(&me));
    }

    #[test]
    fn test_match_info_uses_request_casing() {
        let info = MatchInfo::new(new_info(Uuid::new_v4(), "en", &["vi"]));
        let value = serde_json::to_value(&info).unwrap();

        assert_eq!(value["userId"], serde_json::json!(info.user_id));
        assert!(value.get("createdAt").is_some());
        assert!(value.get("user_id").is_none());
        assert!(value.get("_id").is_none());

        let back: MatchInfo = serde_json::from_value(value).unwrap();
        assert_eq!(back, info);
    }

    #[test]
    fn test_embedding_bytes_and_distance() {
        let v = EmbeddingVector::new(vec![1.0, 0.0]);
        assert_eq!(v.to_le_bytes().len(), 8);
        assert_eq!(&v.to_le_bytes()[..4], &1.0f32.to_le_bytes());

        let same = EmbeddingVector::new(vec![2.0, 0.0]);
        let orthogonal = EmbeddingVector::new(vec![0.0, 1.0]);
        assert!(v.cosine_distance(&same).abs() < 1e-6);
        assert!((v.cosine_distance(&orthogonal) - 1.0).abs() < 1e-6);
        assert_eq!(v.cosine_distance(&EmbeddingVector::new(vec![0.0, 0.0])), 1.0);
    }

    #[test]
    fn test_embedding_is_bare_array() {
        let v: EmbeddingVector = serde_json::from_str("[0.5, 1.5]").unwrap();
        assert_eq!(v.dim(), 2);
        assert_eq!(serde_json::to_string(&v).unwrap(), "[0.5,1.5]");
    }

    #[test]
    fn test_user_ref_accepts_camel_case_friends() {
        let id = Uuid::new_v4();
        let friend = Uuid::new_v4();
        let parsed: UserRef =
            serde_json::from_value(serde_json::json!({ "_id": id, "friendIds": [friend] }))
                .unwrap();
        assert_eq!(parsed, UserRef::new(id).with_friends([friend]));
    }
}
