use std::collections::HashMap;
use std::sync::LazyLock;

/// Normalize an organism name to a canonical key.
///
/// "Escherichia coli", "E. coli" and the WHONET code "ECO" all map to
/// `escherichia_coli`. Unknown names are returned in normalized form.
pub fn normalize_organism(raw: &str) -> String {
    let key = to_key(raw);
    match ORGANISM_ALIASES.get(key.as_str()) {
        Some(canonical) => canonical.to_string(),
        None => key,
    }
}

/// Normalize an antibiotic name to a canonical key.
///
/// "Ciprofloxacin", "Ciprofloxacin (CIP)" and "CIP" all map to `ciprofloxacin`.
pub fn normalize_antibiotic(raw: &str) -> String {
    let key = to_key(raw);
    match ANTIBIOTIC_ALIASES.get(key.as_str()) {
        Some(canonical) => canonical.to_string(),
        None => key,
    }
}

/// Steps:
/// 1. Remove a short trailing code in parentheses: "Ciprofloxacin (CIP)" -> "Ciprofloxacin"
/// 2. Lowercase
/// 3. Replace spaces, dots, hyphens and other separators with underscores
/// 4. Collapse multiple underscores
fn to_key(raw: &str) -> String {
    let mut s = raw.trim().to_string();

    if let Some(idx) = s.rfind('(') {
        let after = &s[idx..];
        if idx > 0 && after.len() <= 6 && after.ends_with(')') {
            s = s[..idx].trim_end().to_string();
        }
    }

    let s = s.to_lowercase();

    let mut normalized = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            'a'..='z' | '0'..='9' => normalized.push(c),
            _ => normalized.push('_'),
        }
    }

    let mut result = String::with_capacity(normalized.len());
    let mut prev_underscore = true; // skips leading underscores
    for c in normalized.chars() {
        if c == '_' {
            if !prev_underscore {
                result.push('_');
            }
            prev_underscore = true;
        } else {
            result.push(c);
            prev_underscore = false;
        }
    }
    if result.ends_with('_') {
        result.pop();
    }
    result
}

static ORGANISM_ALIASES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut m = HashMap::new();

    m.insert("escherichia_coli", "escherichia_coli");
    m.insert("e_coli", "escherichia_coli");
    m.insert("eco", "escherichia_coli");

    m.insert("klebsiella_pneumoniae", "klebsiella_pneumoniae");
    m.insert("k_pneumoniae", "klebsiella_pneumoniae");
    m.insert("kpn", "klebsiella_pneumoniae");

    m.insert("staphylococcus_aureus", "staphylococcus_aureus");
    m.insert("s_aureus", "staphylococcus_aureus");
    m.insert("sau", "staphylococcus_aureus");
    m.insert("mrsa", "staphylococcus_aureus");

    m.insert("pseudomonas_aeruginosa", "pseudomonas_aeruginosa");
    m.insert("p_aeruginosa", "pseudomonas_aeruginosa");
    m.insert("pae", "pseudomonas_aeruginosa");

    m.insert("acinetobacter_baumannii", "acinetobacter_baumannii");
    m.insert("a_baumannii", "acinetobacter_baumannii");
    m.insert("aba", "acinetobacter_baumannii");

    m.insert("streptococcus_pneumoniae", "streptococcus_pneumoniae");
    m.insert("s_pneumoniae", "streptococcus_pneumoniae");
    m.insert("spn", "streptococcus_pneumoniae");

    m.insert("enterococcus_faecium", "enterococcus_faecium");
    m.insert("e_faecium", "enterococcus_faecium");
    m.insert("efm", "enterococcus_faecium");
    m.insert("enterococcus_faecalis", "enterococcus_faecalis");
    m.insert("e_faecalis", "enterococcus_faecalis");
    m.insert("efa", "enterococcus_faecalis");
    m.insert("enterococcus_spp", "enterococcus_spp");

    m
});

static ANTIBIOTIC_ALIASES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut m = HashMap::new();

    m.insert("amoxicillin", "amoxicillin");
    m.insert("amx", "amoxicillin");
    m.insert("ampicillin", "ampicillin");
    m.insert("amp", "ampicillin");
    m.insert("amoxicillin_clavulanic_acid", "amoxicillin_clavulanate");
    m.insert("amoxicillin_clavulanate", "amoxicillin_clavulanate");
    m.insert("co_amoxiclav", "amoxicillin_clavulanate");
    m.insert("amc", "amoxicillin_clavulanate");
    m.insert("piperacillin_tazobactam", "piperacillin_tazobactam");
    m.insert("pip_tazo", "piperacillin_tazobactam");
    m.insert("tzp", "piperacillin_tazobactam");

    m.insert("ceftriaxone", "ceftriaxone");
    m.insert("cro", "ceftriaxone");
    m.insert("ceftazidime", "ceftazidime");
    m.insert("caz", "ceftazidime");
    m.insert("cefepime", "cefepime");
    m.insert("fep", "cefepime");
    m.insert("cefoxitin", "cefoxitin");
    m.insert("fox", "cefoxitin");

    m.insert("meropenem", "meropenem");
    m.insert("mem", "meropenem");
    m.insert("imipenem", "imipenem");
    m.insert("ipm", "imipenem");
    m.insert("ertapenem", "ertapenem");
    m.insert("etp", "ertapenem");

    m.insert("ciprofloxacin", "ciprofloxacin");
    m.insert("cip", "ciprofloxacin");
    m.insert("levofloxacin", "levofloxacin");
    m.insert("lvx", "levofloxacin");

    m.insert("gentamicin", "gentamicin");
    m.insert("gen", "gentamicin");
    m.insert("amikacin", "amikacin");
    m.insert("amk", "amikacin");

    m.insert("vancomycin", "vancomycin");
    m.insert("van", "vancomycin");
    m.insert("linezolid", "linezolid");
    m.insert("lnz", "linezolid");
    m.insert("colistin", "colistin");
    m.insert("col", "colistin");
    m.insert("trimethoprim_sulfamethoxazole", "trimethoprim_sulfamethoxazole");
    m.insert("co_trimoxazole", "trimethoprim_sulfamethoxazole");
    m.insert("sxt", "trimethoprim_sulfamethoxazole");

    m
});
