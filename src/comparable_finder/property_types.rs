use failure::Fail;
use std::str::FromStr;

/// Role a dataset column plays in matching and reporting. The discriminant is
/// the role's position in `ALL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    Ratio = 0,
    Name,
    Address,
    MarketValue,
    Class,
    OwnerName,
    OwnerAddress,
    PropertyType,
    AccountNumber,
}

impl FieldRole {
    /// Report order of the per-comparable columns.
    pub const ALL: [FieldRole; 9] = [
        FieldRole::Ratio,
        FieldRole::Name,
        FieldRole::Address,
        FieldRole::MarketValue,
        FieldRole::Class,
        FieldRole::OwnerName,
        FieldRole::OwnerAddress,
        FieldRole::PropertyType,
        FieldRole::AccountNumber,
    ];
}

#[derive(Debug, Fail, PartialEq)]
pub enum LayoutError {
    #[fail(display = "Unknown layout '{}', expected 'hotel' or 'apartment'", _0)]
    UnknownLayout(String),
    #[fail(display = "Unknown column role '{}'", _0)]
    UnknownRole(String),
    #[fail(display = "Invalid column override '{}', expected ROLE=HEADER", _0)]
    InvalidOverride(String),
}

impl FromStr for FieldRole {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<FieldRole, LayoutError> {
        match s {
            "ratio" => Ok(FieldRole::Ratio),
            "name" => Ok(FieldRole::Name),
            "address" => Ok(FieldRole::Address),
            "value" => Ok(FieldRole::MarketValue),
            "class" => Ok(FieldRole::Class),
            "owner-name" => Ok(FieldRole::OwnerName),
            "owner-address" => Ok(FieldRole::OwnerAddress),
            "type" => Ok(FieldRole::PropertyType),
            "account" => Ok(FieldRole::AccountNumber),
            other => Err(LayoutError::UnknownRole(other.to_owned())),
        }
    }
}

/// Header names of the columns the matcher and the report depend on.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnLayout {
    pub ratio: String,
    pub name: String,
    pub address: String,
    pub market_value: String,
    pub class: String,
    pub owner_name: String,
    pub owner_address: String,
    pub property_type: String,
    pub account_number: String,
}

impl ColumnLayout {
    pub fn hotel() -> ColumnLayout {
        ColumnLayout {
            ratio: "VPR".to_owned(),
            name: "Hotel Name".to_owned(),
            address: "Property Address".to_owned(),
            market_value: "Market Value-2024".to_owned(),
            class: "Hotel Class".to_owned(),
            owner_name: "Owner Name/ LLC Name".to_owned(),
            owner_address: "Owner Street Address".to_owned(),
            property_type: "Type".to_owned(),
            account_number: "account number".to_owned(),
        }
    }

    pub fn apartment() -> ColumnLayout {
        ColumnLayout {
            ratio: "VPU".to_owned(),
            name: "Apartment Name".to_owned(),
            class: "Class".to_owned(),
            ..ColumnLayout::hotel()
        }
    }

    pub fn by_name(name: &str) -> Result<ColumnLayout, LayoutError> {
        match name {
            "hotel" => Ok(ColumnLayout::hotel()),
            "apartment" => Ok(ColumnLayout::apartment()),
            other => Err(LayoutError::UnknownLayout(other.to_owned())),
        }
    }

    pub fn header(&self, role: FieldRole) -> &str {
        match role {
            FieldRole::Ratio => &self.ratio,
            FieldRole::Name => &self.name,
            FieldRole::Address => &self.address,
            FieldRole::MarketValue => &self.market_value,
            FieldRole::Class => &self.class,
            FieldRole::OwnerName => &self.owner_name,
            FieldRole::OwnerAddress => &self.owner_address,
            FieldRole::PropertyType => &self.property_type,
            FieldRole::AccountNumber => &self.account_number,
        }
    }

    fn header_mut(&mut self, role: FieldRole) -> &mut String {
        match role {
            FieldRole::Ratio => &mut self.ratio,
            FieldRole::Name => &mut self.name,
            FieldRole::Address => &mut self.address,
            FieldRole::MarketValue => &mut self.market_value,
            FieldRole::Class => &mut self.class,
            FieldRole::OwnerName => &mut self.owner_name,
            FieldRole::OwnerAddress => &mut self.owner_address,
            FieldRole::PropertyType => &mut self.property_type,
            FieldRole::AccountNumber => &mut self.account_number,
        }
    }

    /// Applies a `role=Header` override, e.g. `ratio=VPU`.
    pub fn apply_override(&mut self, column: &str) -> Result<(), LayoutError> {
        let mut parts = column.splitn(2, '=');
        let role = parts.next().unwrap_or_default().trim();
        let header = match parts.next() {
            Some(h) if !h.trim().is_empty() => h.trim(),
            _ => return Err(LayoutError::InvalidOverride(column.to_owned())),
        };

        *self.header_mut(role.parse()?) = header.to_owned();
        Ok(())
    }
}

impl Default for ColumnLayout {
    fn default() -> Self {
        ColumnLayout::hotel()
    }
}

/// One row of the dataset.
///
/// `cells` keeps the raw row so it can be reported verbatim. The other fields
/// are the typed views the matcher works on; a blank identity or class cell
/// is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRecord {
    pub cells: Vec<String>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub owner_name: Option<String>,
    pub owner_address: Option<String>,
    pub account_number: String,
    pub class: Option<String>,
    pub property_type: String,
    pub market_value: Option<f64>,
    pub ratio: Option<f64>,
}

/// A blank cell is unknown, so it never equals anything, itself included.
#[inline]
fn differs(a: &Option<String>, b: &Option<String>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a != b,
        _ => true,
    }
}

impl PropertyRecord {
    /// True when every identity field differs. This is the eligibility rule:
    /// a shared name alone is enough to exclude a candidate.
    pub fn distinct_identity(&self, other: &PropertyRecord) -> bool {
        differs(&self.name, &other.name)
            && differs(&self.address, &other.address)
            && differs(&self.owner_name, &other.owner_name)
            && differs(&self.owner_address, &other.owner_address)
    }

    /// Name for log and error messages, falling back to the account number.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.account_number)
    }
}

/// `None` for an empty cell.
pub fn non_blank(cell: &str) -> Option<String> {
    if cell.is_empty() {
        None
    } else {
        Some(cell.to_owned())
    }
}

/// Parses a numeric cell. Accepts `$` and thousands separators.
/// Empty, non numeric and non finite cells yield `None`.
pub fn parse_numeric(cell: &str) -> Option<f64> {
    let cleaned: String = cell
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_should_parse_currency_cells() {
        assert_eq!(parse_numeric("$1,250,000"), Some(1_250_000.0));
        assert_eq!(parse_numeric(" 2.5 "), Some(2.5));
    }

    #[test]
    fn it_should_treat_blank_and_garbage_as_missing() {
        assert_eq!(parse_numeric(""), None);
        assert_eq!(parse_numeric("n/a"), None);
        assert_eq!(parse_numeric("NaN"), None);
        assert_eq!(parse_numeric("inf"), None);
    }

    fn record(name: &str, owner_address: &str) -> PropertyRecord {
        PropertyRecord {
            cells: vec![],
            name: non_blank(name),
            address: non_blank(&format!("{} address", name)),
            owner_name: non_blank(&format!("{} owner", name)),
            owner_address: non_blank(owner_address),
            account_number: format!("{}-acct", name),
            class: non_blank("A"),
            property_type: "Hotel".to_owned(),
            market_value: Some(500_000.0),
            ratio: Some(2.0),
        }
    }

    #[test]
    fn it_should_treat_blank_identity_cells_as_different() {
        let subject = record("Grand Plaza", "");
        let peer = record("Peer Inn", "");

        assert!(subject.distinct_identity(&peer));
    }

    #[test]
    fn it_should_treat_equal_identity_cells_as_shared() {
        let subject = record("Grand Plaza", "1 Corporate Way");
        let peer = record("Peer Inn", "1 Corporate Way");

        assert!(!subject.distinct_identity(&peer));
    }

    #[test]
    fn it_should_label_unnamed_records_by_account() {
        let unnamed = record("", "");

        assert_eq!(unnamed.name, None);
        assert_eq!(unnamed.label(), "-acct");
        assert_eq!(record("Peer Inn", "").label(), "Peer Inn");
    }

    #[test]
    fn it_should_switch_headers_for_the_apartment_layout() {
        let layout = ColumnLayout::apartment();

        assert_eq!(layout.header(FieldRole::Ratio), "VPU");
        assert_eq!(layout.header(FieldRole::Class), "Class");
        assert_eq!(layout.header(FieldRole::MarketValue), "Market Value-2024");
    }

    #[test]
    fn it_should_apply_column_overrides() {
        let mut layout = ColumnLayout::hotel();
        layout.apply_override("value=Market Value-2025").unwrap();

        assert_eq!(layout.market_value, "Market Value-2025");
    }

    #[test]
    fn it_should_reject_malformed_overrides() {
        let mut layout = ColumnLayout::hotel();

        assert_eq!(
            layout.apply_override("ratio"),
            Err(LayoutError::InvalidOverride("ratio".to_owned()))
        );
        assert_eq!(
            layout.apply_override("rooms=Rooms"),
            Err(LayoutError::UnknownRole("rooms".to_owned()))
        );
    }
}
