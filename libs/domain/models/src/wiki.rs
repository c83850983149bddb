//! Wiki code canonicalisation. This is the single implementation of
//! the remap table so the sitelink emitter and the pageview emitter
//! can never disagree about what a historical alias maps to.

/// A sitelink JSON key such as `enwiki` or `dewikibooks` split into its
/// language/project part and its site suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSplit {
    pub wiki: String,
    pub site: String,
}

/// Known sitelink key suffixes, longest first so `wikidatawiki` is not
/// mistaken for a `wiki` suffix with `datawiki` left over.
const SITE_SUFFIXES: &[(&str, &str)] = &[
    ("wikidatawiki", "wikidata"),
    ("wikimaniawiki", "wikimania"),
    ("wikibooks", "wikibooks"),
    ("wikiquote", "wikiquote"),
    ("wikisource", "wikisource"),
    ("wikispecies", "wikispecies"),
    ("wikinews", "wikinews"),
    ("wikiversity", "wikiversity"),
    ("wikivoyage", "wikivoyage"),
    ("wiktionary", "wiktionary"),
    ("wikimedia", "wikimedia"),
    ("wiki", "wikipedia"),
];

/// Splits a sitelink key (e.g. `enwiki`, `commonswiki`) into a wiki
/// code and a site name. Returns `None` if no known suffix matches.
pub fn split_sitelink_key(key: &str) -> Option<SiteSplit> {
    for (suffix, site_name) in SITE_SUFFIXES {
        if let Some(wiki) = key.strip_suffix(suffix) {
            return Some(SiteSplit {
                wiki: wiki.to_string(),
                site: site_name.to_string(),
            });
        }
    }
    None
}

/// The outcome of canonicalising a (wiki, site, title) triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canonical {
    pub wiki: String,
    pub site: String,
    pub title: String,
}

/// Applies the authoritative wiki-code remap table. Returns `None` for
/// codes that are dropped outright (retired site families with no
/// surviving content, e.g. `wg-en`).
///
/// Idempotent: canonical codes never themselves appear as remap keys,
/// so re-applying this function to its own output is a no-op.
pub fn canonicalise(wiki: &str, site: &str, title: &str) -> Option<Canonical> {
    if wiki == "wg" && site == "en" {
        return None;
    }

    if wiki.is_empty() && site == "wikidata" {
        return Some(Canonical { wiki: "und".into(), site: "wikidata".into(), title: title.into() });
    }
    if wiki.is_empty() && site == "wikimania" {
        return Some(Canonical { wiki: "und".into(), site: "wikimania".into(), title: title.into() });
    }

    if wiki == "incubator" {
        if let Some(rest) = title.strip_prefix("Wp/") {
            if let Some((lang, remainder)) = rest.split_once('/') {
                return Some(Canonical {
                    wiki: lang.to_ascii_lowercase(),
                    site: site.into(),
                    title: remainder.into(),
                });
            }
        }
    }

    let (wiki, site): (&str, &str) = match wiki {
        "als" => ("gsw", site),
        "bat_smg" => ("sgs", site),
        "be_x_old" => ("be-tarask", site),
        "commons" => (wiki, "commons"),
        "fiu_vro" => ("vro", site),
        "media" => (wiki, "mediawiki"),
        "meta" => (wiki, "metawiki"),
        "roa_rup" => ("rup", site),
        "simple" => ("en-x-simple", site),
        "sources" => (wiki, "wikisource"),
        "species" => (wiki, "wikispecies"),
        "nds_nl" => ("nds-NL", site),
        "zh_classical" => ("lzh", site),
        "zh_min_nan" => ("nan", site),
        "zh_yue" => ("yue", site),
        other => (other, site),
    };

    // The "commons"/"media"/"meta"/"sources"/"species" overrides above
    // also drop the wiki part in favour of `und`, matching the table.
    let wiki = match wiki {
        "commons" | "media" | "meta" | "sources" | "species" => "und",
        other => other,
    };

    Some(Canonical { wiki: wiki.to_string(), site: site.to_string(), title: title.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_plain_wiki_suffix() {
        let split = split_sitelink_key("enwiki").unwrap();
        assert_eq!(split.wiki, "en");
        assert_eq!(split.site, "wikipedia");
    }

    #[test]
    fn splits_longer_suffix_before_shorter() {
        let split = split_sitelink_key("dewikibooks").unwrap();
        assert_eq!(split.wiki, "de");
        assert_eq!(split.site, "wikibooks");
    }

    #[test]
    fn splits_wikidatawiki_to_empty_wiki() {
        let split = split_sitelink_key("wikidatawiki").unwrap();
        assert_eq!(split.wiki, "");
        assert_eq!(split.site, "wikidata");
    }

    #[test]
    fn remaps_als_to_gsw() {
        let c = canonicalise("als", "wikipedia", "Title").unwrap();
        assert_eq!(c.wiki, "gsw");
        assert_eq!(c.site, "wikipedia");
    }

    #[test]
    fn remaps_commons_to_und() {
        let c = canonicalise("commons", "wikipedia", "File:X.png").unwrap();
        assert_eq!(c.wiki, "und");
        assert_eq!(c.site, "commons");
    }

    #[test]
    fn remaps_empty_wikidatawiki_to_und() {
        let c = canonicalise("", "wikidata", "Q1").unwrap();
        assert_eq!(c.wiki, "und");
        assert_eq!(c.site, "wikidata");
    }

    #[test]
    fn drops_retired_wg_en() {
        assert!(canonicalise("wg", "en", "Anything").is_none());
    }

    #[test]
    fn rewrites_incubator_titles() {
        let c = canonicalise("incubator", "wikipedia", "Wp/xx/Some Title").unwrap();
        assert_eq!(c.wiki, "xx");
        assert_eq!(c.title, "Some Title");
    }

    #[test]
    fn canonicalisation_is_idempotent() {
        let first = canonicalise("als", "wikipedia", "Title").unwrap();
        let second = canonicalise(&first.wiki, &first.site, &first.title).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn simple_remaps_to_en_x_simple() {
        let c = canonicalise("simple", "wikipedia", "Title").unwrap();
        assert_eq!(c.wiki, "en-x-simple");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    const KNOWN_WIKI_CODES: &[&str] = &[
        "en", "de", "fr", "als", "bat_smg", "be_x_old", "commons", "fiu_vro", "media", "meta",
        "roa_rup", "simple", "sources", "species", "nds_nl", "zh_classical", "zh_min_nan", "zh_yue",
    ];

    proptest! {
        #[test]
        fn canonicalise_is_idempotent_over_known_and_unknown_codes(
            wiki in prop::sample::select(KNOWN_WIKI_CODES.to_vec()),
            title in "[a-zA-Z0-9 _:.]{0,24}",
        ) {
            let first = canonicalise(wiki, "wikipedia", &title).expect("non-dropped code");
            let second = canonicalise(&first.wiki, &first.site, &first.title).expect("canonical form stays valid");
            prop_assert_eq!(first, second);
        }
    }
}
