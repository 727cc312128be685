//! Stage-1 listing filter: drops companies whose statements are not worth fetching.

const SPAC_KEYWORDS: [&str; 12] = [
    "스팩", "SPAC", "제1호", "제2호", "제3호", "제4호", "제5호", "제6호", "제7호", "제8호", "제9호",
    "호스팩",
];

const SPECIAL_PURPOSE_KEYWORDS: [&str; 5] = ["투자회사", "리츠", "선박투자", "부동산투자", "인프라"];

const DELISTING_RISK_KEYWORDS: [&str; 2] = ["정리매매", "관리종목"];

/// Reason the listing should be skipped, or `None` when it is an ordinary common share.
///
/// Checks run in a fixed order and the first hit wins: SPAC, preferred share, unlisted,
/// special-purpose vehicle, delisting risk.
pub fn is_excluded_listing(corp_name: &str, stock_code: Option<&str>) -> Option<String> {
    if let Some(keyword) = SPAC_KEYWORDS.iter().find(|k| corp_name.contains(*k)) {
        return Some(format!("SPAC ({keyword})"));
    }

    let code = stock_code.map(str::trim).filter(|c| !c.is_empty());

    if let Some(code) = code {
        if code.chars().count() == 6 && !code.ends_with('0') {
            return Some(format!("Preferred share ({code})"));
        }
    }

    match code {
        None | Some("N/A") => return Some("Unlisted (no stock code)".to_string()),
        Some(code) if code.chars().count() != 6 => {
            return Some(format!("Unlisted (invalid stock code {code})"));
        }
        _ => {}
    }

    if let Some(keyword) = SPECIAL_PURPOSE_KEYWORDS
        .iter()
        .find(|k| corp_name.contains(*k))
    {
        return Some(format!("Special-purpose vehicle ({keyword})"));
    }

    DELISTING_RISK_KEYWORDS
        .iter()
        .find(|k| corp_name.contains(*k))
        .map(|keyword| format!("Delisting risk ({keyword})"))
}
