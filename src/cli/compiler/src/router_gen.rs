/* src/cli/compiler/src/router_gen.rs */

// Emits `router.js`: one import per page, the route table, and a small
// runtime (matching, navigation, Link, not-found view). Output is a pure
// function of the inputs so identical route tables give identical bytes.

use std::collections::BTreeMap;
use std::path::Path;

use crate::classify::{AnalyzedRoute, HydrationMode};
use crate::layouts::LayoutSet;
use crate::loading::LoadingSet;
use crate::paths::to_slash;
use crate::routes::{Route, RouteKind};

/// `./<dir>/<rel>` with the source extension swapped for `.js`.
fn compiled_specifier(dir: &str, rel: &Path) -> String {
  let slash = to_slash(&rel.with_extension("js"));
  format!("./{dir}/{slash}")
}

fn js_string(s: &str) -> String {
  serde_json::Value::String(s.to_string()).to_string()
}

fn layout_ident(name: &str) -> String {
  let safe: String = name.chars().map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }).collect();
  format!("Layout_{safe}")
}

/// Builder for the router module. Without hydration data every route is
/// imported eagerly.
#[derive(Debug, Clone, Copy)]
pub struct RouterModule<'a> {
  routes: &'a [Route],
  analyzed: Option<&'a [AnalyzedRoute]>,
  layouts: Option<&'a LayoutSet>,
  loading: Option<&'a LoadingSet>,
}

impl<'a> RouterModule<'a> {
  pub fn new(routes: &'a [Route]) -> Self {
    Self { routes, analyzed: None, layouts: None, loading: None }
  }

  pub fn hydration(mut self, analyzed: &'a [AnalyzedRoute]) -> Self {
    self.analyzed = Some(analyzed);
    self
  }

  pub fn layouts(mut self, layouts: &'a LayoutSet) -> Self {
    self.layouts = Some(layouts);
    self
  }

  pub fn loading(mut self, loading: &'a LoadingSet) -> Self {
    self.loading = Some(loading);
    self
  }

  fn is_lazy(&self, route: &Route) -> bool {
    self.analyzed.is_some_and(|analyzed| {
      analyzed
        .iter()
        .find(|a| a.route.route_path == route.route_path)
        .is_some_and(|a| a.hydration_mode == HydrationMode::None)
    })
  }

  pub fn render(&self) -> String {
    let mut out = String::new();
    out.push_str("// Generated by bertui. Do not edit.\n");
    out.push_str("import React, { useState, useEffect, createContext, useContext } from 'react';\n");

    for (i, route) in self.routes.iter().enumerate() {
      let spec = js_string(&compiled_specifier("pages", &route.source_file));
      if self.is_lazy(route) {
        out.push_str(&format!("const Page{i} = React.lazy(() => import({spec}));\n"));
      } else {
        out.push_str(&format!("import Page{i} from {spec};\n"));
      }
    }

    let mut used_layouts = BTreeMap::new();
    if let Some(layouts) = self.layouts {
      for route in self.routes {
        if let Some(layout) = layouts.match_layout(&route.route_path) {
          used_layouts.insert(layout.name.clone(), layout);
        }
      }
    }
    for layout in used_layouts.values() {
      let spec = js_string(&compiled_specifier("layouts", &layout.source_file));
      out.push_str(&format!("import {} from {spec};\n", layout_ident(&layout.name)));
    }

    let mut used_loading = BTreeMap::new();
    if let Some(loading) = self.loading {
      for route in self.routes.iter().filter(|r| self.is_lazy(r)) {
        if let Some(component) = loading.match_loading(&route.route_path) {
          used_loading.insert(component.route_path.clone(), component);
        }
      }
    }
    for component in used_loading.values() {
      let spec = js_string(&compiled_specifier("pages", &component.source_file));
      out.push_str(&format!("import Loading_{} from {spec};\n", component.safe_name()));
    }

    out.push('\n');
    out.push_str(WITH_LAYOUT);
    out.push_str("\nexport const routes = [\n");
    for (i, route) in self.routes.iter().enumerate() {
      let lazy = self.is_lazy(route);
      let layout = self.layouts.and_then(|l| l.match_layout(&route.route_path));
      let component = match layout {
        Some(l) => format!("withLayout({}, Page{i})", layout_ident(&l.name)),
        None => format!("Page{i}"),
      };
      let loading = match self.loading.and_then(|l| l.match_loading(&route.route_path)) {
        Some(c) if lazy => format!("Loading_{}", c.safe_name()),
        _ => "null".to_string(),
      };
      let kind = match route.kind {
        RouteKind::Static => "static",
        RouteKind::Dynamic => "dynamic",
      };
      out.push_str(&format!(
        "  {{ path: {}, component: {component}, type: '{kind}', hydrate: {}, lazy: {lazy}, loading: {loading} }},\n",
        js_string(&route.route_path),
        !lazy,
      ));
    }
    out.push_str("];\n\n");
    out.push_str(RUNTIME);
    out
  }
}

/// Route table only, all pages imported eagerly.
pub fn generate_router(routes: &[Route]) -> String {
  RouterModule::new(routes).render()
}

/// Entry module used when the project has no `src/main.*`.
pub fn default_entry_module() -> String {
  DEFAULT_ENTRY.to_string()
}

const WITH_LAYOUT: &str = "function withLayout(Layout, Page) {
  return function LayoutWrapped(props) {
    return React.createElement(Layout, props, React.createElement(Page, props));
  };
}
";

const DEFAULT_ENTRY: &str = "import React from 'react';
import { createRoot } from 'react-dom/client';
import { Router, routes } from './router.js';

createRoot(document.getElementById('root')).render(React.createElement(Router, { routes }));
";

const RUNTIME: &str = r#"const RouterContext = createContext(null);
let activeNavigate = null;

function normalizePath(pathname) {
  const trimmed = pathname.replace(/\/+$/, '');
  return trimmed === '' ? '/' : trimmed;
}

function escapeRegExp(text) {
  return text.replace(/[.*+?^${}()|[\]\\]/g, '\\$&');
}

export function matchRoute(pathname, routeList = routes) {
  const path = normalizePath(pathname);
  for (const route of routeList) {
    if (route.type === 'static' && route.path === path) return { route, params: {} };
  }
  for (const route of routeList) {
    if (route.type !== 'dynamic') continue;
    const names = [];
    const pattern = route.path.split('/').map((segment) => {
      const param = /^\[(.+)\]$/.exec(segment);
      if (!param) return escapeRegExp(segment);
      names.push(param[1]);
      return '([^/]+)';
    }).join('/');
    const match = new RegExp('^' + pattern + '$').exec(path);
    if (match) {
      const params = {};
      names.forEach((name, i) => { params[name] = decodeURIComponent(match[i + 1]); });
      return { route, params };
    }
  }
  return null;
}

export function navigate(to, options = {}) {
  if (activeNavigate) activeNavigate(to, options);
  else window.location.href = to;
}

export function useRouter() {
  const ctx = useContext(RouterContext);
  if (!ctx) throw new Error('useRouter must be used inside <Router>');
  return ctx;
}

export function NotFound() {
  return React.createElement('div', { style: { padding: '4rem 1rem', textAlign: 'center', fontFamily: 'system-ui' } },
    React.createElement('h1', { style: { fontSize: '4rem', margin: 0 } }, '404'),
    React.createElement('p', { style: { color: '#6b7280' } }, 'Page not found'),
    React.createElement('a', { href: '/', style: { color: '#10b981' } }, 'Go home'));
}

export function Router({ routes: routeList = routes }) {
  const [pathname, setPathname] = useState(() => normalizePath(window.location.pathname));

  useEffect(() => {
    const onPop = () => setPathname(normalizePath(window.location.pathname));
    window.addEventListener('popstate', onPop);
    return () => window.removeEventListener('popstate', onPop);
  }, []);

  const go = (to, { replace = false } = {}) => {
    if (replace) window.history.replaceState({}, '', to);
    else window.history.pushState({}, '', to);
    setPathname(normalizePath(new URL(to, window.location.origin).pathname));
    window.scrollTo(0, 0);
  };
  activeNavigate = go;

  const matched = matchRoute(pathname, routeList);
  let view = React.createElement(NotFound, null);
  if (matched) {
    const { route, params } = matched;
    view = React.createElement(route.component, { params });
    if (route.lazy) {
      const fallback = route.loading ? React.createElement(route.loading, null) : null;
      view = React.createElement(React.Suspense, { fallback }, view);
    }
  }
  const value = { pathname, params: matched ? matched.params : {}, navigate: go };
  return React.createElement(RouterContext.Provider, { value }, view);
}

export function Link({ to, children, ...rest }) {
  const ctx = useContext(RouterContext);
  const onClick = (event) => {
    if (rest.onClick) rest.onClick(event);
    if (event.defaultPrevented || event.button !== 0) return;
    if (event.metaKey || event.ctrlKey || event.shiftKey || event.altKey) return;
    event.preventDefault();
    if (ctx) ctx.navigate(to);
    else window.location.href = to;
  };
  return React.createElement('a', { ...rest, href: to, onClick }, children);
}
"#;
