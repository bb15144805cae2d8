use {
    super::error::BookingError,
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Amount in minor units (cents). Never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoneyAmount(i64);

impl MoneyAmount {
    pub const ZERO: MoneyAmount = MoneyAmount(0);

    pub fn new(cents: i64) -> Result<Self, BookingError> {
        if cents < 0 {
            return Err(BookingError::Validation(format!(
                "MoneyAmount cannot be negative, got: {cents}"
            )));
        }
        Ok(Self(cents))
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn checked_add(self, other: MoneyAmount) -> Option<MoneyAmount> {
        self.0.checked_add(other.0).map(MoneyAmount)
    }

    pub fn checked_mul(self, quantity: i64) -> Option<MoneyAmount> {
        if quantity < 0 {
            return None;
        }
        self.0.checked_mul(quantity).map(MoneyAmount)
    }

    /// Floors at zero instead of going negative.
    pub fn saturating_sub(self, other: MoneyAmount) -> MoneyAmount {
        MoneyAmount((self.0 - other.0).max(0))
    }

    /// `percent`% of this amount, rounded down to the minor unit.
    pub fn percent(self, percent: u32) -> MoneyAmount {
        let scaled = i128::from(self.0) * i128::from(percent) / 100;
        MoneyAmount(i64::try_from(scaled).unwrap_or(i64::MAX))
    }

    /// Whole major units in `currency`, used for loyalty accrual.
    pub fn major_units(self, currency: Currency) -> i64 {
        self.0 / currency.minor_per_major()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
    Jpy,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Usd => "usd",
            Self::Eur => "eur",
            Self::Gbp => "gbp",
            Self::Jpy => "jpy",
        }
    }

    /// Digits after the decimal point. Yen has no minor unit.
    pub fn minor_digits(&self) -> u32 {
        match self {
            Self::Usd | Self::Eur | Self::Gbp => 2,
            Self::Jpy => 0,
        }
    }

    pub fn minor_per_major(&self) -> i64 {
        10i64.pow(self.minor_digits())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for Currency {
    type Error = BookingError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.to_ascii_lowercase().as_str() {
            "usd" => Ok(Self::Usd),
            "eur" => Ok(Self::Eur),
            "gbp" => Ok(Self::Gbp),
            "jpy" => Ok(Self::Jpy),
            other => Err(BookingError::Validation(format!(
                "unknown currency: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: MoneyAmount,
    currency: Currency,
}

impl Money {
    pub fn new(amount: MoneyAmount, currency: Currency) -> Self {
        Self { amount, currency }
    }

    pub fn amount(&self) -> MoneyAmount {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self.currency.as_str().to_uppercase();
        let cents = self.amount.cents();
        let digits = self.currency.minor_digits();
        if digits == 0 {
            return write!(f, "{cents} {code}");
        }
        let per_major = self.currency.minor_per_major();
        write!(
            f,
            "{}.{:0width$} {code}",
            cents / per_major,
            cents % per_major,
            width = digits as usize
        )
    }
}
