/* src/cli/compiler/src/classify.rs */

// Partial-hydration classifier. A plain substring scan over raw source:
// markers inside comments or strings still count.

use serde::Serialize;

use crate::SERVER_ISLAND_MARKER;
use crate::routes::Route;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkerKind {
  Hook,
  Event,
  BrowserApi,
}

/// Fixed scan order; `features` follow this order, not source order.
pub const INTERACTIVE_MARKERS: &[(MarkerKind, &str)] = &[
  (MarkerKind::Hook, "useState"),
  (MarkerKind::Hook, "useEffect"),
  (MarkerKind::Hook, "useReducer"),
  (MarkerKind::Hook, "useCallback"),
  (MarkerKind::Hook, "useMemo"),
  (MarkerKind::Hook, "useRef"),
  (MarkerKind::Hook, "useContext"),
  (MarkerKind::Hook, "useLayoutEffect"),
  (MarkerKind::Hook, "useTransition"),
  (MarkerKind::Hook, "useDeferredValue"),
  (MarkerKind::Hook, "useSyncExternalStore"),
  (MarkerKind::Event, "onClick"),
  (MarkerKind::Event, "onChange"),
  (MarkerKind::Event, "onSubmit"),
  (MarkerKind::Event, "onInput"),
  (MarkerKind::Event, "onFocus"),
  (MarkerKind::Event, "onBlur"),
  (MarkerKind::Event, "onMouseEnter"),
  (MarkerKind::Event, "onMouseLeave"),
  (MarkerKind::Event, "onKeyDown"),
  (MarkerKind::Event, "onKeyUp"),
  (MarkerKind::Event, "onScroll"),
  (MarkerKind::Event, "onDrop"),
  (MarkerKind::Event, "onDrag"),
  (MarkerKind::Event, "onTouchStart"),
  (MarkerKind::BrowserApi, "window."),
  (MarkerKind::BrowserApi, "document."),
  (MarkerKind::BrowserApi, "localStorage."),
  (MarkerKind::BrowserApi, "sessionStorage."),
  (MarkerKind::BrowserApi, "navigator."),
  (MarkerKind::BrowserApi, "fetch("),
  (MarkerKind::BrowserApi, "WebSocket"),
  (MarkerKind::BrowserApi, "EventSource"),
  (MarkerKind::BrowserApi, "setTimeout("),
  (MarkerKind::BrowserApi, "setInterval("),
  (MarkerKind::BrowserApi, "requestAnimationFrame("),
];

/// Names of a given marker category, in scan order.
pub fn markers_of(kind: MarkerKind) -> impl Iterator<Item = &'static str> {
  INTERACTIVE_MARKERS.iter().filter(move |(k, _)| *k == kind).map(|(_, name)| *name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
  pub kind: MarkerKind,
  pub name: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HydrationMode {
  None,
  Full,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
  pub is_server_island: bool,
  pub interactive: bool,
  pub features: Vec<Feature>,
}

impl Classification {
  /// Server islands never hydrate, even with markers present.
  pub fn hydration_mode(&self) -> HydrationMode {
    if self.is_server_island || !self.interactive { HydrationMode::None } else { HydrationMode::Full }
  }
}

pub fn classify(source: &str) -> Classification {
  let features: Vec<Feature> = INTERACTIVE_MARKERS
    .iter()
    .filter(|(_, name)| source.contains(name))
    .map(|&(kind, name)| Feature { kind, name })
    .collect();
  Classification {
    is_server_island: source.contains(SERVER_ISLAND_MARKER),
    interactive: !features.is_empty(),
    features,
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedRoute {
  #[serde(flatten)]
  pub route: Route,
  pub is_server_island: bool,
  pub interactive: bool,
  pub features: Vec<Feature>,
  pub hydration_mode: HydrationMode,
}

impl AnalyzedRoute {
  pub fn new(route: Route, source: &str) -> Self {
    let c = classify(source);
    let hydration_mode = c.hydration_mode();
    Self {
      route,
      is_server_island: c.is_server_island,
      interactive: c.interactive,
      features: c.features,
      hydration_mode,
    }
  }

  /// Routes that could not be read are treated as fully interactive.
  pub fn unreadable(route: Route) -> Self {
    Self {
      route,
      is_server_island: false,
      interactive: true,
      features: Vec::new(),
      hydration_mode: HydrationMode::Full,
    }
  }
}

/// Static vs interactive split, for the build summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HydrationReport {
  pub static_routes: Vec<String>,
  /// route path and its feature names
  pub interactive_routes: Vec<(String, Vec<&'static str>)>,
}

pub fn hydration_report(analyzed: &[AnalyzedRoute]) -> HydrationReport {
  let mut report = HydrationReport::default();
  for a in analyzed {
    match a.hydration_mode {
      HydrationMode::None => report.static_routes.push(a.route.route_path.clone()),
      HydrationMode::Full => report
        .interactive_routes
        .push((a.route.route_path.clone(), a.features.iter().map(|f| f.name).collect())),
    }
  }
  report
}

#[cfg(test)]
mod tests {
  use std::path::PathBuf;

  use super::*;
  use crate::routes::RouteKind;

  fn route(path: &str) -> Route {
    Route {
      route_path: path.into(),
      source_file: PathBuf::from("x.jsx"),
      absolute_path: PathBuf::from("/x.jsx"),
      kind: RouteKind::Static,
    }
  }

  #[test]
  fn plain_page_is_static() {
    let c = classify("export default function About() { return (<p>About</p>); }");
    assert!(!c.is_server_island);
    assert!(!c.interactive);
    assert!(c.features.is_empty());
    assert_eq!(c.hydration_mode(), HydrationMode::None);
  }

  #[test]
  fn use_state_makes_page_interactive() {
    let c = classify("import { useState } from 'react';\nconst [n, setN] = useState(0);");
    assert!(c.interactive);
    assert_eq!(c.hydration_mode(), HydrationMode::Full);
    assert!(c.features.contains(&Feature { kind: MarkerKind::Hook, name: "useState" }));
  }

  #[test]
  fn features_follow_marker_order_not_source_order() {
    let c = classify("fetch('/x'); <button onClick={f} />; useEffect(() => {});");
    let names: Vec<_> = c.features.iter().map(|f| f.name).collect();
    assert_eq!(names, vec!["useEffect", "onClick", "fetch("]);
    assert_eq!(c.features[2].kind, MarkerKind::BrowserApi);
  }

  #[test]
  fn server_island_wins_over_markers() {
    let src = "export const render = \"server\";\n// window.foo in a comment\n";
    let c = classify(src);
    assert!(c.is_server_island);
    assert!(c.interactive);
    assert_eq!(c.hydration_mode(), HydrationMode::None);
  }

  #[test]
  fn markers_in_comments_still_count() {
    // Known approximation of the text scan.
    let c = classify("// could use useRef later\nexport default () => null;");
    assert!(c.interactive);
  }

  #[test]
  fn markers_of_filters_by_kind() {
    let hooks: Vec<_> = markers_of(MarkerKind::Hook).collect();
    assert_eq!(hooks.len(), 11);
    assert_eq!(hooks[0], "useState");
    assert!(markers_of(MarkerKind::Event).all(|m| m.starts_with("on")));
  }

  #[test]
  fn report_splits_routes() {
    let analyzed = vec![
      AnalyzedRoute::new(route("/"), "return (<h1>Hi</h1>);"),
      AnalyzedRoute::new(route("/counter"), "useState(0); onClick"),
      AnalyzedRoute::unreadable(route("/broken")),
    ];
    let report = hydration_report(&analyzed);
    assert_eq!(report.static_routes, vec!["/"]);
    assert_eq!(report.interactive_routes.len(), 2);
    assert_eq!(report.interactive_routes[0], ("/counter".into(), vec!["useState", "onClick"]));
  }
}
