/// Photo grid, grouped by workflow phase when the photos carry types
use iced::widget::{column, container, image, text, Column};
use iced::{Element, Length};
use iced_aw::Wrap;
use std::collections::HashMap;

use crate::state::data::Photo;
use crate::state::phases::{group_photos, Grouping, WorkflowPhase};
use crate::Message;

const CARD_WIDTH: f32 = 220.0;
const THUMB_HEIGHT: f32 = 165.0;

fn photo_card<'a>(photo: &'a Photo, thumbnails: &'a HashMap<String, image::Handle>) -> Element<'a, Message> {
    let picture: Element<'a, Message> = match thumbnails.get(&photo.id) {
        Some(handle) => image(handle.clone())
            .width(Length::Fixed(CARD_WIDTH))
            .height(Length::Fixed(THUMB_HEIGHT))
            .into(),
        None => container(text("Loading…").size(14))
            .width(Length::Fixed(CARD_WIDTH))
            .height(Length::Fixed(THUMB_HEIGHT))
            .center_x(Length::Fixed(CARD_WIDTH))
            .center_y(Length::Fixed(THUMB_HEIGHT))
            .into(),
    };

    let mut card = column![picture, text(&photo.description).size(14)].spacing(4);

    if let Some(location) = photo.location.as_deref().filter(|l| !l.trim().is_empty()) {
        card = card.push(text(location).size(12));
    }
    if let Some(notes) = photo.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        card = card.push(text(notes).size(12));
    }
    card = card.push(text(photo.created_at.format("%d %b %Y %H:%M").to_string()).size(12));

    container(card).width(Length::Fixed(CARD_WIDTH)).into()
}

fn grid<'a>(
    photos: impl IntoIterator<Item = &'a Photo>,
    thumbnails: &'a HashMap<String, image::Handle>,
) -> Element<'a, Message> {
    let cards = photos
        .into_iter()
        .map(|photo| photo_card(photo, thumbnails))
        .collect();
    Wrap::with_elements(cards).spacing(16.0).line_spacing(16.0).into()
}

fn section<'a>(
    heading: String,
    photos: Vec<&'a Photo>,
    thumbnails: &'a HashMap<String, image::Handle>,
) -> Element<'a, Message> {
    column![text(heading).size(20), grid(photos, thumbnails)]
        .spacing(10)
        .into()
}

/// Grouped sections, or one flat grid when no photo has a type.
pub fn view<'a>(
    photos: &'a [Photo],
    phases: &'a [WorkflowPhase],
    thumbnails: &'a HashMap<String, image::Handle>,
) -> Element<'a, Message> {
    if photos.is_empty() {
        return text("No photos have been shared yet.").into();
    }

    match group_photos(photos, phases) {
        Grouping::Flat => grid(photos, thumbnails),
        Grouping::Phased {
            groups,
            uncategorised,
        } => {
            let mut sections: Column<'a, Message> = Column::new().spacing(28);
            for group in groups {
                let heading = format!("{} ({})", group.phase.label, group.photos.len());
                sections = sections.push(section(heading, group.photos, thumbnails));
            }
            if !uncategorised.is_empty() {
                let heading = format!("Other ({})", uncategorised.len());
                sections = sections.push(section(heading, uncategorised, thumbnails));
            }
            sections.into()
        }
    }
}
