//! The editor form. Every button posts the whole form plus an `action`
//! field; the handler applies the edits, runs the action, saves the draft
//! and redirects.

use std::str::FromStr;

use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use axum_extra::extract::cookie::CookieJar;

use super::pages::Visit;
use super::render::profile_href;
use super::server::AppState;
use crate::draft::{AlbumPatch, Direction, Draft};
use crate::publish;
use crate::toast;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditorAction {
    Save,
    Add,
    Clear,
    Publish,
    Move(usize, Direction),
    Remove(usize),
}

#[derive(Debug, PartialEq, Eq)]
pub struct UnknownAction(pub String);

impl FromStr for EditorAction {
    type Err = UnknownAction;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownAction(raw.to_string());
        let action = match raw.split_once(':') {
            None => match raw {
                "save" => EditorAction::Save,
                "add" => EditorAction::Add,
                "clear" => EditorAction::Clear,
                "publish" => EditorAction::Publish,
                _ => return Err(unknown()),
            },
            Some((verb, index)) => {
                let index: usize = index.parse().map_err(|_| unknown())?;
                match verb {
                    "up" => EditorAction::Move(index, Direction::Up),
                    "down" => EditorAction::Move(index, Direction::Down),
                    "remove" => EditorAction::Remove(index),
                    _ => return Err(unknown()),
                }
            }
        };
        Ok(action)
    }
}

/// The submitted form, decoded.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct EditorForm {
    pub name: Option<String>,
    pub patches: Vec<(usize, AlbumPatch)>,
    pub action: Option<EditorAction>,
}

impl EditorForm {
    pub fn parse(fields: Vec<(String, String)>) -> Self {
        let mut form = EditorForm::default();

        for (key, value) in fields {
            if key == "name" {
                form.name = Some(value);
                continue;
            }
            if key == "action" {
                match value.parse() {
                    Ok(action) => form.action = Some(action),
                    Err(UnknownAction(raw)) => tracing::debug!(action = %raw, "ignoring unknown action"),
                }
                continue;
            }

            let Some((field, index)) = key.rsplit_once('_') else {
                continue;
            };
            let Ok(index) = index.parse::<usize>() else {
                continue;
            };
            let patch = form.patch_mut(index);
            match field {
                "title" => patch.title = Some(value),
                "artist" => patch.artist = Some(value),
                "why" => patch.why = Some(value),
                _ => {}
            }
        }

        form
    }

    fn patch_mut(&mut self, index: usize) -> &mut AlbumPatch {
        let position = match self.patches.iter().position(|(i, _)| *i == index) {
            Some(position) => position,
            None => {
                self.patches.push((index, AlbumPatch::default()));
                self.patches.len() - 1
            }
        };
        &mut self.patches[position].1
    }

    /// Copy the typed-in values onto the draft.
    pub fn apply_edits(&mut self, draft: &mut Draft) {
        if let Some(name) = self.name.take() {
            draft.name = name;
        }
        for (index, patch) in self.patches.drain(..) {
            draft.update_album(index, patch);
        }
    }
}

pub async fn submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(fields): Form<Vec<(String, String)>>,
) -> Response {
    let visit = Visit::begin(&state, jar);
    let Visit {
        jar,
        visitor,
        session,
    } = visit;

    let mut form = EditorForm::parse(fields);

    // Only signed-in visitors have a draft to edit.
    let Some(session) = session else {
        if form.action == Some(EditorAction::Publish) {
            state.toasts.push(&visitor, toast::SIGN_IN_TO_PUBLISH);
        }
        return (jar, Redirect::to("/app")).into_response();
    };

    let mut draft = state.drafts.load(&visitor);
    form.apply_edits(&mut draft);

    let mut destination = "/app".to_string();
    match form.action.unwrap_or(EditorAction::Save) {
        EditorAction::Save => {}
        EditorAction::Add => {
            draft.add_blank();
        }
        EditorAction::Clear => {
            draft.clear();
            state.toasts.push(&visitor, toast::CLEARED);
        }
        EditorAction::Move(index, direction) => {
            draft.move_album(index, direction);
        }
        EditorAction::Remove(index) => {
            draft.remove_at(index);
        }
        EditorAction::Publish => {
            match publish::publish(state.tables.as_ref(), Some(&session), &draft).await {
                Ok(username) => {
                    state.toasts.push(&visitor, toast::PUBLISHED);
                    destination = profile_href(&username);
                }
                Err(err) => {
                    tracing::warn!(%visitor, error = %err, "publish failed");
                    state.toasts.push(&visitor, err.toast());
                }
            }
        }
    }

    if let Err(err) = state.drafts.save(&visitor, draft) {
        tracing::error!(%visitor, error = %err, "failed to save draft");
    }

    (jar, Redirect::to(&destination)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_actions() {
        assert_eq!("add".parse(), Ok(EditorAction::Add));
        assert_eq!("publish".parse(), Ok(EditorAction::Publish));
        assert_eq!("up:3".parse(), Ok(EditorAction::Move(3, Direction::Up)));
        assert_eq!("down:0".parse(), Ok(EditorAction::Move(0, Direction::Down)));
        assert_eq!("remove:9".parse(), Ok(EditorAction::Remove(9)));

        assert!("up:".parse::<EditorAction>().is_err());
        assert!("up:-1".parse::<EditorAction>().is_err());
        assert!("sideways:1".parse::<EditorAction>().is_err());
        assert!("delete".parse::<EditorAction>().is_err());
    }

    #[test]
    fn test_parse_form_groups_fields_by_row() {
        let form = EditorForm::parse(fields(&[
            ("name", "Jane"),
            ("title_0", "Blue"),
            ("artist_0", "Joni Mitchell"),
            ("why_0", ""),
            ("title_1", "Kid A"),
            ("action", "down:0"),
            ("bogus_x", "ignored"),
        ]));

        assert_eq!(form.name.as_deref(), Some("Jane"));
        assert_eq!(form.action, Some(EditorAction::Move(0, Direction::Down)));
        assert_eq!(form.patches.len(), 2);
        assert_eq!(
            form.patches[0],
            (
                0,
                AlbumPatch {
                    title: Some("Blue".to_string()),
                    artist: Some("Joni Mitchell".to_string()),
                    why: Some(String::new()),
                }
            )
        );
    }

    #[test]
    fn test_apply_edits_before_action() {
        let mut draft = Draft::default();
        draft.add_blank();
        draft.add_blank();

        let mut form = EditorForm::parse(fields(&[
            ("name", "Jane"),
            ("title_0", "Blue"),
            ("title_1", "Kid A"),
            ("title_7", "out of range"),
        ]));
        form.apply_edits(&mut draft);

        assert_eq!(draft.name, "Jane");
        assert_eq!(draft.albums[0].title, "Blue");
        assert_eq!(draft.albums[1].title, "Kid A");
        assert_eq!(draft.albums.len(), 2);
    }
}
