mod money;

pub mod op;

pub use money::{Money, MoneyConversionError, LOCAL_CURRENCY_CODE, USD_CURRENCY_CODE};
