//! Validated request -> crawler command-line tokens.
//!
//! Rules:
//! - the `-seed <url>` pair always comes first
//! - boolean flags are emitted only when they differ from the crawler's own default
//! - numeric knobs are always explicit, so the request (not the crawler build) decides them
//!
//! The `-output <path>` pair is owned by the runner and never produced here.

use crawlpipe_core::{CrawlRequest, Valid};

pub fn compile(req: &Valid<CrawlRequest>) -> Vec<String> {
    let mut out = vec!["-seed".to_string(), req.url.clone()];

    if req.extract_links {
        out.push("-extract-links".to_string());
    }
    push_value(&mut out, "-depth", req.depth);
    push_value(&mut out, "-max", req.max_pages);
    push_value(&mut out, "-workers", req.workers);
    if !req.stay_domain {
        out.push("-stay-domain=false".to_string());
    }
    if let Some(filter) = req.filter.as_deref().filter(|f| !f.is_empty()) {
        out.push("-filter".to_string());
        out.push(filter.to_string());
    }
    if req.seed_only {
        out.push("-seed-only".to_string());
    }
    if req.news {
        out.push("-news".to_string());
    }
    push_value(&mut out, "-delay", req.delay);
    push_value(&mut out, "-timeout", req.timeout);
    if req.verbose {
        out.push("-verbose".to_string());
    }
    out
}

fn push_value(out: &mut Vec<String>, flag: &str, value: u32) {
    out.push(flag.to_string());
    out.push(value.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crawlpipe_core::{limits, Validate};
    use proptest::prelude::*;

    fn value_of<'a>(tokens: &'a [String], flag: &str) -> Option<&'a str> {
        tokens
            .iter()
            .position(|t| t == flag)
            .and_then(|i| tokens.get(i + 1))
            .map(String::as_str)
    }

    fn valid(req: CrawlRequest) -> Valid<CrawlRequest> {
        req.validated().expect("valid request")
    }

    #[test]
    fn defaults_compile_to_explicit_numbers_and_no_flags() {
        let tokens = compile(&valid(CrawlRequest::new("https://example.com")));
        assert_eq!(
            tokens,
            [
                "-seed",
                "https://example.com",
                "-depth",
                "1",
                "-max",
                "20",
                "-workers",
                "2",
                "-delay",
                "1",
                "-timeout",
                "10"
            ]
        );
    }

    #[test]
    fn stay_domain_is_only_emitted_when_disabled() {
        let on = compile(&valid(CrawlRequest::new("https://e.com")));
        assert!(!on.iter().any(|t| t.starts_with("-stay-domain")));
        let off = compile(&valid(CrawlRequest {
            stay_domain: false,
            ..CrawlRequest::new("https://e.com")
        }));
        assert!(off.contains(&"-stay-domain=false".to_string()));
    }

    #[test]
    fn empty_filter_is_dropped() {
        for filter in [Some(String::new()), None] {
            let t = compile(&valid(CrawlRequest {
                filter,
                ..CrawlRequest::new("https://e.com")
            }));
            assert!(value_of(&t, "-filter").is_none());
        }
        for filter in ["/wiki/", "   "] {
            let t = compile(&valid(CrawlRequest {
                filter: Some(filter.to_string()),
                ..CrawlRequest::new("https://e.com")
            }));
            assert_eq!(value_of(&t, "-filter"), Some(filter));
        }
    }

    #[test]
    fn all_flags_on() {
        let t = compile(&valid(CrawlRequest {
            extract_links: true,
            seed_only: true,
            news: true,
            verbose: true,
            ..CrawlRequest::new("https://e.com")
        }));
        for flag in ["-extract-links", "-seed-only", "-news", "-verbose"] {
            assert!(t.iter().any(|x| x == flag), "missing {flag}");
        }
    }

    #[test]
    fn output_flag_is_never_compiled() {
        let t = compile(&valid(CrawlRequest::new("https://e.com")));
        assert!(!t.iter().any(|x| x == "-output"));
    }

    proptest! {
        #[test]
        fn seed_pair_first_and_numbers_always_present(
            depth in limits::DEPTH,
            max_pages in limits::MAX_PAGES,
            workers in limits::WORKERS,
            delay in limits::DELAY_S,
            timeout in limits::TIMEOUT_S,
            extract_links in any::<bool>(),
            stay_domain in any::<bool>(),
            seed_only in any::<bool>(),
            news in any::<bool>(),
            verbose in any::<bool>(),
            filter in proptest::option::of("[a-z/]{0,8}"),
        ) {
            let req = valid(CrawlRequest {
                url: "https://example.com/start".to_string(),
                extract_links,
                depth,
                max_pages,
                workers,
                stay_domain,
                filter,
                seed_only,
                news,
                delay,
                timeout,
                verbose,
            });
            let t = compile(&req);
            prop_assert_eq!(&t[0], "-seed");
            prop_assert_eq!(&t[1], "https://example.com/start");
            let depth_s = depth.to_string();
            let max_s = max_pages.to_string();
            let workers_s = workers.to_string();
            let delay_s = delay.to_string();
            let timeout_s = timeout.to_string();
            prop_assert_eq!(value_of(&t, "-depth"), Some(depth_s.as_str()));
            prop_assert_eq!(value_of(&t, "-max"), Some(max_s.as_str()));
            prop_assert_eq!(value_of(&t, "-workers"), Some(workers_s.as_str()));
            prop_assert_eq!(value_of(&t, "-delay"), Some(delay_s.as_str()));
            prop_assert_eq!(value_of(&t, "-timeout"), Some(timeout_s.as_str()));
            prop_assert_eq!(t.iter().any(|x| x == "-seed-only"), seed_only);
        }
    }
}
