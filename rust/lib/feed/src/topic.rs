//! Subscription routing by path pattern.
//!
//! Paths are `/`-separated. In a pattern, `+` matches exactly one segment
//! and `#` (last segment only) matches the rest of the path, including
//! nothing at all.

use std::collections::HashMap;

pub(crate) struct TopicTree<T> {
    children: HashMap<String, TopicTree<T>>,
    one: Option<Box<TopicTree<T>>>,
    rest: Vec<T>,
    here: Vec<T>,
}

impl<T> Default for TopicTree<T> {
    fn default() -> Self {
        Self { children: HashMap::new(), one: None, rest: Vec::new(), here: Vec::new() }
    }
}

fn split(path: &str) -> (&str, &str) {
    path.split_once('/').unwrap_or((path, ""))
}

impl<T: Clone> TopicTree<T> {
    pub(crate) fn insert(&mut self, pattern: &str, value: T) {
        if pattern.is_empty() {
            self.here.push(value);
            return;
        }
        let (head, tail) = split(pattern);
        match head {
            "#" => self.rest.push(value),
            "+" => self.one.get_or_insert_with(Default::default).insert(tail, value),
            seg => self.children.entry(seg.to_string()).or_default().insert(tail, value),
        }
    }

    /// Every value whose pattern matches the concrete `path`.
    pub(crate) fn matches(&self, path: &str, out: &mut Vec<T>) {
        out.extend(self.rest.iter().cloned());
        if path.is_empty() {
            out.extend(self.here.iter().cloned());
            return;
        }
        let (head, tail) = split(path);
        if let Some(child) = self.children.get(head) {
            child.matches(tail, out);
        }
        if let Some(ref one) = self.one {
            one.matches(tail, out);
        }
    }

    /// Drops values matching `pred` anywhere in the tree.
    pub(crate) fn retain(&mut self, pred: &dyn Fn(&T) -> bool) -> usize {
        let before = self.here.len() + self.rest.len();
        self.here.retain(|v| pred(v));
        self.rest.retain(|v| pred(v));
        let mut removed = before - self.here.len() - self.rest.len();
        if let Some(ref mut one) = self.one {
            removed += one.retain(pred);
        }
        for child in self.children.values_mut() {
            removed += child.retain(pred);
        }
        removed
    }
}
