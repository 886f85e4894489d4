//! Flexbox container backed by Taffy.
//!
//! A [`FlexPanel`] builds a throwaway `TaffyTree` on every measure/arrange
//! call. Each child becomes a leaf whose measure function runs the child's
//! own `measure`, so text and nested containers size themselves the usual
//! way and Taffy only distributes the space.

use log::warn;
use taffy::{
    AlignItems as TaffyAlignItems, AvailableSpace, Display, FlexDirection as TaffyFlexDirection,
    FlexWrap as TaffyFlexWrap, JustifyContent as TaffyJustifyContent, LengthPercentage, NodeId,
    Rect as TaffyRect, Size as TaffySize, Style, TaffyError, TaffyTree,
};

use super::LayoutContext;
use crate::control::{Control, ControlId, Layout, Render, Visibility};
use crate::geometry::{Rect, Size, Thickness};
use crate::render::RenderingBuffer;
use crate::types::{Cell, Opacity};

// =============================================================================
// Style enums
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlexDirection {
    #[default]
    Row,
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlexWrap {
    #[default]
    NoWrap,
    Wrap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlexJustify {
    #[default]
    Start,
    Center,
    End,
    SpaceBetween,
    SpaceAround,
    SpaceEvenly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlexAlign {
    Start,
    Center,
    End,
    #[default]
    Stretch,
}

fn to_taffy_direction(dir: FlexDirection) -> TaffyFlexDirection {
    match dir {
        FlexDirection::Row => TaffyFlexDirection::Row,
        FlexDirection::Column => TaffyFlexDirection::Column,
    }
}

fn to_taffy_wrap(wrap: FlexWrap) -> TaffyFlexWrap {
    match wrap {
        FlexWrap::NoWrap => TaffyFlexWrap::NoWrap,
        FlexWrap::Wrap => TaffyFlexWrap::Wrap,
    }
}

fn to_taffy_justify(justify: FlexJustify) -> Option<TaffyJustifyContent> {
    Some(match justify {
        FlexJustify::Start => TaffyJustifyContent::FlexStart,
        FlexJustify::Center => TaffyJustifyContent::Center,
        FlexJustify::End => TaffyJustifyContent::FlexEnd,
        FlexJustify::SpaceBetween => TaffyJustifyContent::SpaceBetween,
        FlexJustify::SpaceAround => TaffyJustifyContent::SpaceAround,
        FlexJustify::SpaceEvenly => TaffyJustifyContent::SpaceEvenly,
    })
}

fn to_taffy_align(align: FlexAlign) -> Option<TaffyAlignItems> {
    Some(match align {
        FlexAlign::Start => TaffyAlignItems::FlexStart,
        FlexAlign::Center => TaffyAlignItems::Center,
        FlexAlign::End => TaffyAlignItems::FlexEnd,
        FlexAlign::Stretch => TaffyAlignItems::Stretch,
    })
}

fn length(cells: i32) -> LengthPercentage {
    LengthPercentage::Length(cells as f32)
}

fn to_space(cells: i32) -> AvailableSpace {
    if cells == Size::INFINITE {
        AvailableSpace::MaxContent
    } else {
        AvailableSpace::Definite(cells as f32)
    }
}

fn from_space(space: AvailableSpace) -> i32 {
    match space {
        AvailableSpace::Definite(v) => v.max(0.0).floor() as i32,
        AvailableSpace::MinContent | AvailableSpace::MaxContent => Size::INFINITE,
    }
}

// =============================================================================
// FlexPanel
// =============================================================================

/// Container laying out its children along one axis.
#[derive(Debug, Clone)]
pub struct FlexPanel {
    pub direction: FlexDirection,
    pub wrap: FlexWrap,
    pub justify: FlexJustify,
    pub align_items: FlexAlign,
    pub gap: i32,
    pub padding: Thickness,
    pub background: Cell,
    pub opacity: Opacity,
}

impl Default for FlexPanel {
    fn default() -> Self {
        Self {
            direction: FlexDirection::Row,
            wrap: FlexWrap::NoWrap,
            justify: FlexJustify::Start,
            align_items: FlexAlign::Stretch,
            gap: 0,
            padding: Thickness::ZERO,
            background: Cell::default(),
            opacity: Opacity::OPAQUE,
        }
    }
}

impl FlexPanel {
    pub fn row() -> Self {
        Self::default()
    }

    pub fn column() -> Self {
        Self {
            direction: FlexDirection::Column,
            ..Self::default()
        }
    }

    fn container_style(&self) -> Style {
        Style {
            display: Display::Flex,
            flex_direction: to_taffy_direction(self.direction),
            flex_wrap: to_taffy_wrap(self.wrap),
            justify_content: to_taffy_justify(self.justify),
            align_items: to_taffy_align(self.align_items),
            gap: TaffySize {
                width: length(self.gap),
                height: length(self.gap),
            },
            padding: TaffyRect {
                left: length(self.padding.left),
                right: length(self.padding.right),
                top: length(self.padding.top),
                bottom: length(self.padding.bottom),
            },
            ..Default::default()
        }
    }

    /// Run Taffy over the children and return the container size plus one slot per child.
    fn solve(
        &self,
        ctx: &mut LayoutContext<'_>,
        available: TaffySize<AvailableSpace>,
        definite: Option<Size>,
    ) -> Result<(Size, Vec<(ControlId, Rect)>), TaffyError> {
        let children = ctx.children();
        let mut taffy: TaffyTree<usize> = TaffyTree::new();

        let mut leaves: Vec<NodeId> = Vec::with_capacity(children.len());
        for (i, &child) in children.iter().enumerate() {
            let display = if ctx.visibility(child) == Visibility::Collapsed {
                Display::None
            } else {
                Display::Flex
            };
            let style = Style {
                display,
                flex_shrink: 1.0,
                ..Default::default()
            };
            leaves.push(taffy.new_leaf_with_context(style, i)?);
        }

        let mut container = self.container_style();
        if let Some(size) = definite {
            container.size = TaffySize {
                width: taffy::Dimension::Length(size.width as f32),
                height: taffy::Dimension::Length(size.height as f32),
            };
        }
        let root = taffy.new_with_children(container, &leaves)?;

        taffy.compute_layout_with_measure(
            root,
            available,
            |known: TaffySize<Option<f32>>,
             space: TaffySize<AvailableSpace>,
             _node: NodeId,
             context: Option<&mut usize>,
             _style: &Style| {
                let Some(&mut i) = context else {
                    return TaffySize::ZERO;
                };
                let offer = Size {
                    width: known.width.map_or_else(|| from_space(space.width), |w| w as i32),
                    height: known.height.map_or_else(|| from_space(space.height), |h| h as i32),
                };
                let desired = ctx.measure(children[i], offer);
                TaffySize {
                    width: known.width.unwrap_or(desired.width as f32),
                    height: known.height.unwrap_or(desired.height as f32),
                }
            },
        )?;

        let outer = taffy.layout(root)?;
        let size = Size::new(
            outer.size.width.round().max(0.0) as i32,
            outer.size.height.round().max(0.0) as i32,
        );
        let mut slots = Vec::with_capacity(children.len());
        for (&child, &leaf) in children.iter().zip(&leaves) {
            let l = taffy.layout(leaf)?;
            slots.push((
                child,
                Rect::new(
                    l.location.x.round() as i32,
                    l.location.y.round() as i32,
                    l.size.width.round().max(0.0) as i32,
                    l.size.height.round().max(0.0) as i32,
                ),
            ));
        }
        Ok((size, slots))
    }
}

impl Layout for FlexPanel {
    fn measure_override(&mut self, ctx: &mut LayoutContext<'_>, available: Size) -> Size {
        let space = TaffySize {
            width: to_space(available.width),
            height: to_space(available.height),
        };
        match self.solve(ctx, space, None) {
            Ok((size, _)) => size,
            Err(err) => {
                warn!("flex measure of {} failed: {err:?}", ctx.id());
                Size::ZERO
            }
        }
    }

    fn arrange_override(&mut self, ctx: &mut LayoutContext<'_>, final_size: Size) -> Size {
        let space = TaffySize {
            width: AvailableSpace::Definite(final_size.width as f32),
            height: AvailableSpace::Definite(final_size.height as f32),
        };
        match self.solve(ctx, space, Some(final_size)) {
            Ok((_, slots)) => {
                for (child, slot) in slots {
                    ctx.arrange(child, slot);
                }
            }
            Err(err) => warn!("flex arrange of {} failed: {err:?}", ctx.id()),
        }
        final_size
    }
}

impl Render for FlexPanel {
    fn render(&self, buffer: &mut RenderingBuffer, render_size: Size) {
        buffer.fill_rectangle(Rect::from_size(render_size), self.background, self.opacity);
    }
}

impl Control for FlexPanel {}
