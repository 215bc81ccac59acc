// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2026 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Enumerations shared by CryptoMarket requests and notifications.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Candle aggregation periods.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    PartialEq,
    Eq,
    Hash,
    AsRefStr,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
pub enum CryptomarketCandlePeriod {
    #[strum(serialize = "M1")]
    #[serde(rename = "M1")]
    Minute1,
    #[strum(serialize = "M3")]
    #[serde(rename = "M3")]
    Minutes3,
    #[strum(serialize = "M5")]
    #[serde(rename = "M5")]
    Minutes5,
    #[strum(serialize = "M15")]
    #[serde(rename = "M15")]
    Minutes15,
    #[default]
    #[strum(serialize = "M30")]
    #[serde(rename = "M30")]
    Minutes30,
    #[strum(serialize = "H1")]
    #[serde(rename = "H1")]
    Hour1,
    #[strum(serialize = "H4")]
    #[serde(rename = "H4")]
    Hours4,
    #[strum(serialize = "D1")]
    #[serde(rename = "D1")]
    Day1,
    #[strum(serialize = "D7")]
    #[serde(rename = "D7")]
    Days7,
    #[strum(serialize = "1M")]
    #[serde(rename = "1M")]
    Month1,
}

/// Order side.
#[derive(
    Clone,
    Copy,
    Debug,
    Display,
    PartialEq,
    Eq,
    Hash,
    AsRefStr,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CryptomarketOrderSide {
    Buy,
    Sell,
}

/// Order type.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    PartialEq,
    Eq,
    Hash,
    AsRefStr,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum CryptomarketOrderType {
    #[default]
    Limit,
    Market,
    StopLimit,
    StopMarket,
    TakeProfitLimit,
    TakeProfitMarket,
}

/// Time in force.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    PartialEq,
    Eq,
    Hash,
    AsRefStr,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
pub enum CryptomarketTimeInForce {
    /// Good till cancel.
    #[default]
    #[serde(rename = "GTC")]
    #[strum(serialize = "GTC")]
    Gtc,
    /// Immediate or cancel.
    #[serde(rename = "IOC")]
    #[strum(serialize = "IOC")]
    Ioc,
    /// Fill or kill.
    #[serde(rename = "FOK")]
    #[strum(serialize = "FOK")]
    Fok,
    /// Valid during the trading day.
    #[serde(rename = "Day")]
    #[strum(serialize = "Day")]
    Day,
    /// Good till date.
    #[serde(rename = "GTD")]
    #[strum(serialize = "GTD")]
    Gtd,
}

/// Contingency between the orders of an order list.
#[derive(
    Clone,
    Copy,
    Debug,
    Display,
    PartialEq,
    Eq,
    Hash,
    AsRefStr,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum CryptomarketContingencyType {
    /// Every order fills in full or none of them is placed.
    AllOrNone,
    /// Filling one order cancels the other.
    OneCancelOther,
    /// The first order triggers a one-cancels-other pair.
    OneTriggerOneCancelOther,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(CryptomarketCandlePeriod::Minute1, "M1")]
    #[case(CryptomarketCandlePeriod::Minutes15, "M15")]
    #[case(CryptomarketCandlePeriod::Month1, "1M")]
    fn test_candle_period_wire_format(
        #[case] period: CryptomarketCandlePeriod,
        #[case] expected: &str,
    ) {
        assert_eq!(period.as_ref(), expected);
        assert_eq!(
            serde_json::to_string(&period).unwrap(),
            format!("\"{expected}\"")
        );
        assert_eq!(CryptomarketCandlePeriod::from_str(expected).unwrap(), period);
    }

    #[rstest]
    fn test_order_enums_serialize_like_the_venue() {
        assert_eq!(
            serde_json::to_string(&CryptomarketOrderType::StopLimit).unwrap(),
            "\"stopLimit\""
        );
        assert_eq!(CryptomarketOrderSide::Sell.to_string(), "sell");
        assert_eq!(
            serde_json::to_string(&CryptomarketTimeInForce::Day).unwrap(),
            "\"Day\""
        );
        assert_eq!(
            serde_json::to_string(&CryptomarketContingencyType::OneTriggerOneCancelOther).unwrap(),
            "\"oneTriggerOneCancelOther\""
        );
        assert_eq!(
            CryptomarketContingencyType::from_str("allOrNone").unwrap(),
            CryptomarketContingencyType::AllOrNone
        );
    }
}
