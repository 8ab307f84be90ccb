//! Canonical spend categories and the deterministic merchant/portal resolver.

use serde::{Deserialize, Serialize};

/// Fixed spend taxonomy. Every purchase resolves to exactly one of these.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Category {
    #[serde(rename = "dining")]
    Dining,
    #[serde(rename = "groceries")]
    Groceries,
    #[serde(rename = "travel-flights")]
    TravelFlights,
    #[serde(rename = "travel-hotels")]
    TravelHotels,
    #[serde(rename = "travel-rail")]
    TravelRail,
    #[serde(rename = "travel-cabs")]
    TravelCabs,
    #[serde(rename = "travel-other")]
    TravelOther,
    #[serde(rename = "fuel")]
    Fuel,
    #[serde(rename = "utilities")]
    Utilities,
    #[serde(rename = "telecom")]
    Telecom,
    #[serde(rename = "shopping-online")]
    ShoppingOnline,
    #[serde(rename = "shopping-retail")]
    ShoppingRetail,
    #[serde(rename = "entertainment")]
    Entertainment,
    #[serde(rename = "healthcare")]
    Healthcare,
    #[serde(rename = "education")]
    Education,
    #[serde(rename = "insurance")]
    Insurance,
    #[serde(rename = "government")]
    GovernmentServices,
    #[serde(rename = "rent")]
    Rent,
    #[serde(rename = "wallet-loads")]
    WalletLoads,
    #[serde(rename = "emi")]
    EmiPayments,
    #[serde(rename = "jewellery")]
    Jewellery,
    #[serde(rename = "other")]
    Other,
}

impl Category {
    pub const ALL: [Category; 22] = [
        Category::Dining,
        Category::Groceries,
        Category::TravelFlights,
        Category::TravelHotels,
        Category::TravelRail,
        Category::TravelCabs,
        Category::TravelOther,
        Category::Fuel,
        Category::Utilities,
        Category::Telecom,
        Category::ShoppingOnline,
        Category::ShoppingRetail,
        Category::Entertainment,
        Category::Healthcare,
        Category::Education,
        Category::Insurance,
        Category::GovernmentServices,
        Category::Rent,
        Category::WalletLoads,
        Category::EmiPayments,
        Category::Jewellery,
        Category::Other,
    ];

    /// Human-readable label used in rule summaries and CLI tables.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Dining => "Dining",
            Category::Groceries => "Groceries",
            Category::TravelFlights => "Travel - Flights",
            Category::TravelHotels => "Travel - Hotels",
            Category::TravelRail => "Travel - Railways",
            Category::TravelCabs => "Travel - Cabs & Rideshare",
            Category::TravelOther => "Travel - Other",
            Category::Fuel => "Fuel",
            Category::Utilities => "Utilities",
            Category::Telecom => "Telecom & Internet",
            Category::ShoppingOnline => "Shopping - Online",
            Category::ShoppingRetail => "Shopping - Retail",
            Category::Entertainment => "Entertainment",
            Category::Healthcare => "Healthcare",
            Category::Education => "Education",
            Category::Insurance => "Insurance",
            Category::GovernmentServices => "Government Services",
            Category::Rent => "Rent",
            Category::WalletLoads => "Wallet & Prepaid Loads",
            Category::EmiPayments => "EMI Payments",
            Category::Jewellery => "Jewellery",
            Category::Other => "Other",
        }
    }

    /// Default Merchant Category Code for this spend class. `Other` has no
    /// meaningful code.
    pub fn mcc(&self) -> Option<u16> {
        match self {
            Category::Dining => Some(5812),
            Category::Groceries => Some(5411),
            Category::TravelFlights => Some(4511),
            Category::TravelHotels => Some(7011),
            Category::TravelRail => Some(4112),
            Category::TravelCabs => Some(4121),
            Category::TravelOther => Some(4722),
            Category::Fuel => Some(5541),
            Category::Utilities => Some(4900),
            Category::Telecom => Some(4814),
            Category::ShoppingOnline => Some(5399),
            Category::ShoppingRetail => Some(5311),
            Category::Entertainment => Some(7832),
            Category::Healthcare => Some(8062),
            Category::Education => Some(8220),
            Category::Insurance => Some(6300),
            Category::GovernmentServices => Some(9399),
            Category::Rent => Some(6513),
            Category::WalletLoads => Some(6540),
            Category::EmiPayments => Some(6012),
            Category::Jewellery => Some(5944),
            Category::Other => None,
        }
    }

    /// Parse a user-supplied category name (kebab-case id or a common alias).
    pub fn parse(s: &str) -> Option<Category> {
        let norm = s.trim().to_lowercase();
        let cat = match norm.as_str() {
            "dining" | "food" | "restaurants" => Category::Dining,
            "groceries" | "grocery" => Category::Groceries,
            "travel-flights" | "flights" => Category::TravelFlights,
            "travel-hotels" | "hotels" => Category::TravelHotels,
            "travel-rail" | "rail" | "railways" => Category::TravelRail,
            "travel-cabs" | "cabs" | "rideshare" => Category::TravelCabs,
            "travel-other" | "travel" => Category::TravelOther,
            "fuel" | "petrol" => Category::Fuel,
            "utilities" => Category::Utilities,
            "telecom" | "internet" => Category::Telecom,
            "shopping-online" | "online" => Category::ShoppingOnline,
            "shopping-retail" | "retail" => Category::ShoppingRetail,
            "entertainment" => Category::Entertainment,
            "healthcare" | "medical" => Category::Healthcare,
            "education" => Category::Education,
            "insurance" => Category::Insurance,
            "government" | "government-services" => Category::GovernmentServices,
            "rent" => Category::Rent,
            "wallet-loads" | "wallet" => Category::WalletLoads,
            "emi" | "emi-payments" => Category::EmiPayments,
            "jewellery" | "jewelry" => Category::Jewellery,
            "other" => Category::Other,
            _ => return None,
        };
        Some(cat)
    }
}

/// Resolver output: the canonical category plus its MCC when one applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub category: Category,
    pub mcc: Option<u16>,
}

/// Resolve a purchase into a canonical category.
///
/// Order: built-in merchant table, then portal hint, then caller hint, then
/// `Other`. Never fails; an unknown merchant with no hints still matches a
/// card's base rule downstream.
pub fn resolve_category(
    merchant: Option<&str>,
    portal: Option<&str>,
    hint: Option<Category>,
) -> Resolution {
    let category = merchant
        .and_then(merchant_category)
        .or_else(|| portal.and_then(portal_category))
        .or(hint)
        .unwrap_or(Category::Other);

    Resolution {
        category,
        mcc: category.mcc(),
    }
}

/// Built-in merchant keyword table, checked as normalized substring matches.
fn merchant_category(merchant: &str) -> Option<Category> {
    let m = merchant.to_uppercase();

    // Groceries before dining: quick-commerce arms share brand names with
    // their food-delivery parents.
    if m.contains("INSTAMART")
        || m.contains("BLINKIT")
        || m.contains("BIGBASKET")
        || m.contains("ZEPTO")
        || m.contains("DMART")
        || m.contains("GROCER")
    {
        return Some(Category::Groceries);
    }

    if m.contains("SWIGGY")
        || m.contains("ZOMATO")
        || m.contains("DOMINO")
        || m.contains("MCDONALD")
        || m.contains("KFC")
        || m.contains("RESTAURANT")
        || m.contains("CAFE")
    {
        return Some(Category::Dining);
    }

    if m.contains("INDIGO")
        || m.contains("AIR INDIA")
        || m.contains("VISTARA")
        || m.contains("SPICEJET")
        || m.contains("AKASA")
        || m.contains("EMIRATES")
        || m.contains("AIRLINE")
    {
        return Some(Category::TravelFlights);
    }

    if m.contains("MARRIOTT")
        || m.contains("TAJ HOTEL")
        || m.contains("ITC HOTEL")
        || m.contains("OYO")
        || m.contains("RADISSON")
        || m.contains("HYATT")
        || m.contains("HOTEL")
    {
        return Some(Category::TravelHotels);
    }

    if m.contains("IRCTC") || m.contains("RAILWAY") {
        return Some(Category::TravelRail);
    }

    if m.contains("UBER")
        || m.contains("OLA CABS")
        || m.contains("RAPIDO")
        || m.contains("ZOOMCAR")
    {
        return Some(Category::TravelCabs);
    }

    if m.contains("MAKEMYTRIP")
        || m.contains("YATRA")
        || m.contains("CLEARTRIP")
        || m.contains("GOIBIBO")
        || m.contains("EASEMYTRIP")
    {
        return Some(Category::TravelOther);
    }

    if m.contains("INDIAN OIL")
        || m.contains("INDIANOIL")
        || m.contains("HPCL")
        || m.contains("BPCL")
        || m.contains("BHARAT PETROLEUM")
        || m.contains("PETROL")
    {
        return Some(Category::Fuel);
    }

    if m.contains("TATA POWER")
        || m.contains("BESCOM")
        || m.contains("ADANI ELECTRICITY")
        || m.contains("TORRENT POWER")
        || m.contains("ELECTRICITY")
    {
        return Some(Category::Utilities);
    }

    if m.contains("AIRTEL")
        || m.contains("JIO")
        || m.contains("VODAFONE")
        || m.contains("BSNL")
        || m.contains("FIBERNET")
    {
        return Some(Category::Telecom);
    }

    // Jewellery before general retail: jewellers are excluded categories on
    // most cards and must never fall through to a shopping rule.
    if m.contains("TANISHQ")
        || m.contains("KALYAN")
        || m.contains("JOYALUKKAS")
        || m.contains("CARATLANE")
        || m.contains("JEWEL")
    {
        return Some(Category::Jewellery);
    }

    if m.contains("AMAZON")
        || m.contains("FLIPKART")
        || m.contains("MYNTRA")
        || m.contains("AJIO")
        || m.contains("NYKAA")
        || m.contains("MEESHO")
    {
        return Some(Category::ShoppingOnline);
    }

    if m.contains("RELIANCE RETAIL")
        || m.contains("SHOPPERS STOP")
        || m.contains("LIFESTYLE")
        || m.contains("WESTSIDE")
        || m.contains("CROMA")
    {
        return Some(Category::ShoppingRetail);
    }

    if m.contains("BOOKMYSHOW")
        || m.contains("PVR")
        || m.contains("INOX")
        || m.contains("NETFLIX")
        || m.contains("HOTSTAR")
        || m.contains("SPOTIFY")
    {
        return Some(Category::Entertainment);
    }

    if m.contains("APOLLO")
        || m.contains("PHARMEASY")
        || m.contains("NETMEDS")
        || m.contains("MEDPLUS")
        || m.contains("PHARMACY")
        || m.contains("HOSPITAL")
    {
        return Some(Category::Healthcare);
    }

    if m.contains("UDEMY")
        || m.contains("COURSERA")
        || m.contains("BYJU")
        || m.contains("UNIVERSITY")
        || m.contains("COLLEGE")
        || m.contains("TUITION")
    {
        return Some(Category::Education);
    }

    if m.contains("LIC OF INDIA")
        || m.contains("HDFC ERGO")
        || m.contains("ICICI LOMBARD")
        || m.contains("STAR HEALTH")
        || m.contains("ACKO")
        || m.contains("INSURANCE")
    {
        return Some(Category::Insurance);
    }

    if m.contains("INCOME TAX")
        || m.contains("GST")
        || m.contains("PASSPORT")
        || m.contains("MUNICIPAL")
        || m.contains("CHALLAN")
    {
        return Some(Category::GovernmentServices);
    }

    if m.contains("PAYTM WALLET") || m.contains("MOBIKWIK") || m.contains("FREECHARGE") {
        return Some(Category::WalletLoads);
    }

    if m.contains("BAJAJ FINSERV") || m.contains("ZESTMONEY") || m.contains(" EMI") {
        return Some(Category::EmiPayments);
    }

    if m.contains("NOBROKER") || m.contains("NESTAWAY") || m.contains("RENT") {
        return Some(Category::Rent);
    }

    None
}

/// Payment portals imply a category when the merchant itself is unknown.
fn portal_category(portal: &str) -> Option<Category> {
    match portal.trim().to_lowercase().as_str() {
        "smartbuy" | "smart buy" => Some(Category::ShoppingOnline),
        "gyftr" => Some(Category::ShoppingOnline),
        "ishop" => Some(Category::ShoppingOnline),
        "cred" => Some(Category::Utilities),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merchant_lookup_wins() {
        let r = resolve_category(Some("SWIGGY BANGALORE"), Some("smartbuy"), Some(Category::Fuel));
        assert_eq!(r.category, Category::Dining);
        assert_eq!(r.mcc, Some(5812));
    }

    #[test]
    fn test_portal_hint_when_merchant_unknown() {
        let r = resolve_category(Some("UNKNOWN STORE 42"), Some("SmartBuy"), None);
        assert_eq!(r.category, Category::ShoppingOnline);
    }

    #[test]
    fn test_caller_hint_fallback() {
        let r = resolve_category(Some("corner shop"), None, Some(Category::Groceries));
        assert_eq!(r.category, Category::Groceries);
    }

    #[test]
    fn test_degrades_to_other() {
        let r = resolve_category(Some("mystery merchant"), None, None);
        assert_eq!(r.category, Category::Other);
        assert_eq!(r.mcc, None);

        let r = resolve_category(None, None, None);
        assert_eq!(r.category, Category::Other);
    }

    #[test]
    fn test_quick_commerce_is_groceries_not_dining() {
        let r = resolve_category(Some("SWIGGY INSTAMART"), None, None);
        assert_eq!(r.category, Category::Groceries);
    }

    #[test]
    fn test_jeweller_never_reaches_shopping() {
        let r = resolve_category(Some("TANISHQ MG ROAD"), None, None);
        assert_eq!(r.category, Category::Jewellery);
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(Category::parse("flights"), Some(Category::TravelFlights));
        assert_eq!(Category::parse("Jewelry"), Some(Category::Jewellery));
        assert_eq!(Category::parse("no-such"), None);
    }

    #[test]
    fn test_taxonomy_size_and_serde_names() {
        assert_eq!(Category::ALL.len(), 22);
        let json = serde_json::to_string(&Category::TravelFlights).unwrap();
        assert_eq!(json, "\"travel-flights\"");
    }
}
