// Data models for the Whisper prediction market

use crate::amount::TokenAmount;
use crate::store::{Record, StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ===== FIELD NAMES (flat store representation) =====

pub const FIELD_ID: &str = "id";
pub const FIELD_QUESTION: &str = "question";
pub const FIELD_DESCRIPTION: &str = "description";
pub const FIELD_CREATOR: &str = "creator";
pub const FIELD_CREATED_AT: &str = "createdAt";
pub const FIELD_EXPIRES_AT: &str = "expiresAt";
pub const FIELD_TOTAL_YES: &str = "totalYesAmount";
pub const FIELD_TOTAL_NO: &str = "totalNoAmount";
pub const FIELD_RESOLVED: &str = "resolved";
pub const FIELD_OUTCOME: &str = "outcome";
pub const FIELD_CATEGORY: &str = "category";
pub const FIELD_TAGS: &str = "tags";
pub const FIELD_VISIBILITY: &str = "visibility";
pub const FIELD_ACCESS_LIST: &str = "accessList";
pub const FIELD_MARKET_ID: &str = "marketId";
pub const FIELD_BETTOR: &str = "bettor";
pub const FIELD_AMOUNT: &str = "amount";
pub const FIELD_TIMESTAMP: &str = "timestamp";

/// Access tier of a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
    /// Open to everyone; meant for pseudonymous participants.
    Whisper,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
            Visibility::Whisper => "whisper",
        }
    }

    /// `uint8` code used by the settlement contract.
    pub fn contract_code(&self) -> u8 {
        match self {
            Visibility::Public => 0,
            Visibility::Private => 1,
            Visibility::Whisper => 2,
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            "whisper" => Ok(Visibility::Whisper),
            other => Err(format!("unknown visibility {:?}", other)),
        }
    }
}

/// Binary prediction market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    pub id: String,
    pub question: String,
    pub description: String,
    pub creator: String,
    /// Unix milliseconds
    pub created_at: i64,
    /// Betting deadline, Unix milliseconds
    pub expires_at: i64,
    pub total_yes_amount: TokenAmount,
    pub total_no_amount: TokenAmount,
    pub resolved: bool,
    /// Only meaningful once `resolved` is true
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<bool>,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub visibility: Visibility,
    /// Identities allowed to bet; only kept for private markets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_list: Option<Vec<String>>,
}

/// Yes/No split of the pools in whole percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolOdds {
    pub yes_percent: u64,
    pub no_percent: u64,
}

impl Market {
    pub fn is_expired_at(&self, now_millis: i64) -> bool {
        self.expires_at <= now_millis
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn pool_field(outcome: bool) -> &'static str {
        if outcome {
            FIELD_TOTAL_YES
        } else {
            FIELD_TOTAL_NO
        }
    }

    pub fn pool(&self, outcome: bool) -> TokenAmount {
        if outcome {
            self.total_yes_amount
        } else {
            self.total_no_amount
        }
    }

    /// Empty pools read as an even 50/50.
    pub fn odds(&self) -> PoolOdds {
        let yes_percent = self
            .total_yes_amount
            .percent_of_pool(self.total_no_amount)
            .unwrap_or(50);
        PoolOdds {
            yes_percent,
            no_percent: 100 - yes_percent,
        }
    }

    pub fn to_fields(&self) -> Record {
        let mut record = Record::new();
        record.insert(FIELD_ID.into(), self.id.clone());
        record.insert(FIELD_QUESTION.into(), self.question.clone());
        record.insert(FIELD_DESCRIPTION.into(), self.description.clone());
        record.insert(FIELD_CREATOR.into(), self.creator.clone());
        record.insert(FIELD_CREATED_AT.into(), self.created_at.to_string());
        record.insert(FIELD_EXPIRES_AT.into(), self.expires_at.to_string());
        record.insert(FIELD_TOTAL_YES.into(), self.total_yes_amount.to_string());
        record.insert(FIELD_TOTAL_NO.into(), self.total_no_amount.to_string());
        record.insert(FIELD_RESOLVED.into(), self.resolved.to_string());
        if let Some(outcome) = self.outcome {
            record.insert(FIELD_OUTCOME.into(), outcome.to_string());
        }
        record.insert(FIELD_CATEGORY.into(), self.category.clone());
        record.insert(FIELD_TAGS.into(), encode_list(&self.tags));
        record.insert(FIELD_VISIBILITY.into(), self.visibility.as_str().to_string());
        if let Some(access_list) = &self.access_list {
            record.insert(FIELD_ACCESS_LIST.into(), encode_list(access_list));
        }
        record
    }

    pub fn from_fields(key: &str, record: &Record) -> StoreResult<Self> {
        let fields = Fields { key, record };
        let resolved = fields.boolean(FIELD_RESOLVED)?;
        Ok(Self {
            id: fields.text(FIELD_ID)?,
            question: fields.text(FIELD_QUESTION)?,
            description: fields.text(FIELD_DESCRIPTION)?,
            creator: fields.text(FIELD_CREATOR)?,
            created_at: fields.integer(FIELD_CREATED_AT)?,
            expires_at: fields.integer(FIELD_EXPIRES_AT)?,
            total_yes_amount: fields.amount_or_zero(FIELD_TOTAL_YES)?,
            total_no_amount: fields.amount_or_zero(FIELD_TOTAL_NO)?,
            resolved,
            outcome: if resolved {
                fields.optional_boolean(FIELD_OUTCOME)?
            } else {
                None
            },
            category: fields.text(FIELD_CATEGORY)?,
            tags: fields.optional_list(FIELD_TAGS)?.unwrap_or_default(),
            visibility: fields
                .text(FIELD_VISIBILITY)?
                .parse()
                .map_err(|e: String| StoreError::malformed(key, e))?,
            access_list: fields.optional_list(FIELD_ACCESS_LIST)?,
        })
    }
}

/// A single stake on one side of a market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bet {
    pub id: String,
    pub market_id: String,
    pub bettor: String,
    pub outcome: bool,
    pub amount: TokenAmount,
    /// Unix milliseconds
    pub timestamp: i64,
}

impl Bet {
    pub fn to_fields(&self) -> Record {
        let mut record = Record::new();
        record.insert(FIELD_ID.into(), self.id.clone());
        record.insert(FIELD_MARKET_ID.into(), self.market_id.clone());
        record.insert(FIELD_BETTOR.into(), self.bettor.clone());
        record.insert(FIELD_OUTCOME.into(), self.outcome.to_string());
        record.insert(FIELD_AMOUNT.into(), self.amount.to_string());
        record.insert(FIELD_TIMESTAMP.into(), self.timestamp.to_string());
        record
    }

    pub fn from_fields(key: &str, record: &Record) -> StoreResult<Self> {
        let fields = Fields { key, record };
        Ok(Self {
            id: fields.text(FIELD_ID)?,
            market_id: fields.text(FIELD_MARKET_ID)?,
            bettor: fields.text(FIELD_BETTOR)?,
            outcome: fields.boolean(FIELD_OUTCOME)?,
            amount: TokenAmount::parse(&fields.text(FIELD_AMOUNT)?)
                .map_err(|e| StoreError::malformed(key, e.to_string()))?,
            timestamp: fields.integer(FIELD_TIMESTAMP)?,
        })
    }
}

fn encode_list(items: &[String]) -> String {
    // Vec<String> always serializes
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

/// Typed accessors over a raw record, reporting which key is broken.
struct Fields<'a> {
    key: &'a str,
    record: &'a Record,
}

impl Fields<'_> {
    fn raw(&self, field: &str) -> StoreResult<&str> {
        self.record
            .get(field)
            .map(String::as_str)
            .ok_or_else(|| StoreError::malformed(self.key, format!("missing field {}", field)))
    }

    fn text(&self, field: &str) -> StoreResult<String> {
        self.raw(field).map(str::to_string)
    }

    fn integer(&self, field: &str) -> StoreResult<i64> {
        let raw = self.raw(field)?;
        raw.parse()
            .map_err(|_| StoreError::malformed(self.key, format!("{} is not an integer: {:?}", field, raw)))
    }

    fn boolean(&self, field: &str) -> StoreResult<bool> {
        parse_bool(self.key, field, self.raw(field)?)
    }

    fn optional_boolean(&self, field: &str) -> StoreResult<Option<bool>> {
        self.record
            .get(field)
            .map(|raw| parse_bool(self.key, field, raw))
            .transpose()
    }

    fn amount_or_zero(&self, field: &str) -> StoreResult<TokenAmount> {
        match self.record.get(field) {
            Some(raw) => TokenAmount::parse(raw)
                .map_err(|e| StoreError::malformed(self.key, format!("{}: {}", field, e))),
            None => Ok(TokenAmount::ZERO),
        }
    }

    fn optional_list(&self, field: &str) -> StoreResult<Option<Vec<String>>> {
        self.record
            .get(field)
            .map(|raw| {
                serde_json::from_str(raw)
                    .map_err(|e| StoreError::malformed(self.key, format!("{}: {}", field, e)))
            })
            .transpose()
    }
}

fn parse_bool(key: &str, field: &str, raw: &str) -> StoreResult<bool> {
    match raw {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(StoreError::malformed(
            key,
            format!("{} is not a boolean: {:?}", field, other),
        )),
    }
}

// ===== REQUEST / QUERY TYPES =====

/// POST /markets request body.
///
/// Everything is optional at the serde level so that a missing field comes back
/// as a 400 with a message instead of a generic rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMarketRequest {
    pub question: Option<String>,
    pub description: Option<String>,
    pub creator: Option<String>,
    pub expires_at: Option<i64>,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    pub visibility: Option<String>,
    #[serde(default)]
    pub access_list: Option<Vec<String>>,
}

/// PUT /markets/:id request body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolveMarketRequest {
    pub resolved: Option<bool>,
    pub outcome: Option<bool>,
}

/// POST /bets request body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceBetRequest {
    pub market_id: Option<String>,
    pub bettor: Option<String>,
    pub outcome: Option<bool>,
    pub amount: Option<AmountInput>,
}

/// Stake as sent by clients: a decimal string or a plain JSON integer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Text(String),
    Number(serde_json::Number),
}

impl AmountInput {
    pub fn as_text(&self) -> String {
        match self {
            AmountInput::Text(text) => text.clone(),
            AmountInput::Number(number) => number.to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, AmountInput::Text(text) if text.trim().is_empty())
    }
}

/// GET /markets query string. All filters combine with AND.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketFilter {
    pub category: Option<String>,
    pub visibility: Option<Visibility>,
    pub creator: Option<String>,
    pub resolved: Option<bool>,
    pub tag: Option<String>,
    /// Hide private markets this identity may not access
    pub viewer: Option<String>,
}

/// GET /bets query string
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetFilter {
    pub market_id: Option<String>,
    pub bettor: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_market() -> Market {
        Market {
            id: "market_1".into(),
            question: "Will ETH flip BTC?".into(),
            description: "Resolves YES on a market cap flip".into(),
            creator: "0xcreator".into(),
            created_at: 1_700_000_000_000,
            expires_at: 1_800_000_000_000,
            total_yes_amount: TokenAmount::from(100),
            total_no_amount: TokenAmount::from(50),
            resolved: false,
            outcome: None,
            category: "Crypto".into(),
            tags: vec!["eth".into(), "btc".into()],
            visibility: Visibility::Private,
            access_list: Some(vec!["alice".into()]),
        }
    }

    #[test]
    fn test_market_fields_roundtrip() {
        let market = sample_market();
        let record = market.to_fields();
        assert_eq!(record[FIELD_TOTAL_YES], "100");
        assert_eq!(record[FIELD_RESOLVED], "false");
        assert_eq!(record[FIELD_TAGS], r#"["eth","btc"]"#);
        assert!(!record.contains_key(FIELD_OUTCOME));

        let decoded = Market::from_fields("market:market_1", &record).unwrap();
        assert_eq!(decoded, market);
    }

    #[test]
    fn test_outcome_ignored_until_resolved() {
        let mut record = sample_market().to_fields();
        record.insert(FIELD_OUTCOME.into(), "true".into());
        let market = Market::from_fields("market:market_1", &record).unwrap();
        assert_eq!(market.outcome, None);

        record.insert(FIELD_RESOLVED.into(), "true".into());
        let market = Market::from_fields("market:market_1", &record).unwrap();
        assert_eq!(market.outcome, Some(true));
    }

    #[test]
    fn test_malformed_market_record() {
        let mut record = sample_market().to_fields();
        record.insert(FIELD_EXPIRES_AT.into(), "tomorrow".into());
        let err = Market::from_fields("market:market_1", &record).unwrap_err();
        assert!(err.to_string().contains("expiresAt"));

        let mut record = sample_market().to_fields();
        record.remove(FIELD_QUESTION);
        assert!(Market::from_fields("market:market_1", &record).is_err());

        let mut record = sample_market().to_fields();
        record.insert(FIELD_VISIBILITY.into(), "secret".into());
        assert!(Market::from_fields("market:market_1", &record).is_err());
    }

    #[test]
    fn test_odds() {
        let mut market = sample_market();
        assert_eq!(market.odds(), PoolOdds { yes_percent: 66, no_percent: 34 });

        market.total_yes_amount = TokenAmount::ZERO;
        market.total_no_amount = TokenAmount::ZERO;
        assert_eq!(market.odds(), PoolOdds { yes_percent: 50, no_percent: 50 });
    }

    #[test]
    fn test_market_json_shape() {
        let json = serde_json::to_value(sample_market()).unwrap();
        assert_eq!(json["totalYesAmount"], "100");
        assert_eq!(json["expiresAt"], 1_800_000_000_000i64);
        assert_eq!(json["visibility"], "private");
        assert_eq!(json["accessList"][0], "alice");
        assert!(json.get("outcome").is_none());
    }

    #[test]
    fn test_bet_fields_roundtrip() {
        let bet = Bet {
            id: "bet_1".into(),
            market_id: "market_1".into(),
            bettor: "alice".into(),
            outcome: false,
            amount: TokenAmount::from(25),
            timestamp: 1_700_000_000_500,
        };
        let decoded = Bet::from_fields("bet:bet_1", &bet.to_fields()).unwrap();
        assert_eq!(decoded, bet);
    }

    #[test]
    fn test_amount_input_accepts_strings_and_numbers() {
        let req: PlaceBetRequest =
            serde_json::from_str(r#"{"marketId":"m","bettor":"b","outcome":true,"amount":"10"}"#)
                .unwrap();
        assert_eq!(req.amount.unwrap().as_text(), "10");

        let req: PlaceBetRequest =
            serde_json::from_str(r#"{"marketId":"m","bettor":"b","outcome":true,"amount":10}"#)
                .unwrap();
        assert_eq!(req.amount.unwrap().as_text(), "10");
    }

    #[test]
    fn test_visibility_parsing() {
        assert_eq!("whisper".parse::<Visibility>().unwrap(), Visibility::Whisper);
        assert!("Public".parse::<Visibility>().is_err());
        assert_eq!(Visibility::Private.contract_code(), 1);
    }
}
