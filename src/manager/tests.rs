use super::*;
use crate::link::RecordingLink;
use crate::panel::{
    Address, ButtonType, CollapseDirection, CollapseState, Feedback, FlipAction, LevelRange,
    PageFlip, Rect,
};
use crate::project::{
    ButtonDef, CollapsibleDef, PageDef, ProjectDef, ProjectResources, SubPageDef, SubViewDef,
};
use crate::protocol::{CustomEvent, Message, StringMessage, STRING_BUFFER_SIZE};
use crate::surface::{RecordingSurface, SurfaceCall};
use super::query::EVENT_FILL_COLOR;
use super::syspage::{CHANNEL_EXIT_SETUP, CHANNEL_LOG_DEBUG, TEXT_LOG_LEVEL, TEXT_VOLUME};
use super::system::SETUP_PAGE;

// ============================================================================
// Fixture
// ============================================================================

const MAIN: u16 = 1;
const SECOND: u16 = 2;
const OTHER: u16 = 3;
const DIALOG: u16 = 503;
const DRAWER: u16 = 504;
const TOAST: u16 = 505;
const MODAL: u16 = 506;
const OVERLAY: u16 = 507;

fn make_button(index: u16, name: &str, rect: Rect) -> ButtonDef {
    ButtonDef {
        index,
        name: name.into(),
        rect,
        ..ButtonDef::default()
    }
}

fn make_popup(id: u16, name: &str, rect: Rect) -> SubPageDef {
    SubPageDef {
        id,
        name: name.into(),
        rect,
        ..SubPageDef::default()
    }
}

fn make_project() -> ProjectDef {
    let main = PageDef {
        id: MAIN,
        name: "Main".into(),
        buttons: vec![
            ButtonDef {
                channel: Some(Address::new(1, 10)),
                address: Some(Address::new(1, 10)),
                feedback: Feedback::Channel,
                ..make_button(1, "Power", Rect::new(0, 0, 100, 50))
            },
            ButtonDef {
                kind: ButtonType::Bargraph,
                level: Some(Address::new(1, 3)),
                address: Some(Address::new(1, 20)),
                range: LevelRange {
                    low: 0,
                    high: 100,
                    invert: true,
                    ..LevelRange::default()
                },
                ..make_button(2, "Volume", Rect::new(0, 100, 20, 100))
            },
            ButtonDef {
                address: Some(Address::new(1, 30)),
                ..make_button(3, "Label", Rect::new(200, 0, 100, 50))
            },
            ButtonDef {
                channel: Some(Address::new(1, 40)),
                page_flips: vec![PageFlip {
                    action: FlipAction::Show,
                    target: "Dialog".into(),
                    password: 0,
                }],
                ..make_button(4, "Go", Rect::new(400, 0, 100, 50))
            },
            ButtonDef {
                kind: ButtonType::SubPageView,
                address: Some(Address::new(1, 60)),
                subview: Some(SubViewDef {
                    items: vec!["A".into(), "B".into()],
                    ..SubViewDef::default()
                }),
                ..make_button(5, "Viewer", Rect::new(0, 400, 300, 200))
            },
        ],
        ..PageDef::default()
    };
    let second = PageDef {
        id: SECOND,
        name: "Second".into(),
        buttons: vec![ButtonDef {
            channel: Some(Address::new(1, 10)),
            address: Some(Address::new(1, 11)),
            feedback: Feedback::Channel,
            ..make_button(1, "Power", Rect::new(0, 0, 100, 50))
        }],
        ..PageDef::default()
    };
    let other = PageDef {
        id: OTHER,
        name: "Other".into(),
        buttons: vec![ButtonDef {
            channel: Some(Address::new(1, 11)),
            feedback: Feedback::Channel,
            ..make_button(1, "Mute", Rect::new(0, 0, 100, 50))
        }],
        ..PageDef::default()
    };
    let setup = PageDef {
        id: SETUP_PAGE,
        name: "Setup".into(),
        buttons: vec![
            ButtonDef {
                address: Some(Address::new(0, TEXT_VOLUME)),
                ..make_button(1, "VolumeText", Rect::new(200, 200, 100, 50))
            },
            ButtonDef {
                channel: Some(Address::new(0, CHANNEL_EXIT_SETUP)),
                ..make_button(2, "Done", Rect::new(0, 0, 100, 100))
            },
            ButtonDef {
                channel: Some(Address::new(0, CHANNEL_LOG_DEBUG)),
                ..make_button(3, "Debug", Rect::new(0, 300, 100, 50))
            },
            ButtonDef {
                address: Some(Address::new(0, TEXT_LOG_LEVEL)),
                ..make_button(4, "LogLevel", Rect::new(200, 300, 100, 50))
            },
        ],
        ..PageDef::default()
    };

    let square = Rect::new(0, 0, 200, 200);
    let grouped = |id: u16, name: &str| SubPageDef {
        group: "sources".into(),
        ..make_popup(id, name, square)
    };

    ProjectDef {
        name: "Test".into(),
        power_up_page: Some("Main".into()),
        pages: vec![main, second, other, setup],
        subpages: vec![
            grouped(500, "A"),
            grouped(501, "B"),
            grouped(502, "C"),
            SubPageDef {
                buttons: vec![ButtonDef {
                    channel: Some(Address::new(1, 50)),
                    address: Some(Address::new(1, 50)),
                    ..make_button(1, "Ok", Rect::new(0, 0, 50, 50))
                }],
                ..make_popup(DIALOG, "Dialog", Rect::new(300, 300, 200, 200))
            },
            SubPageDef {
                collapsible: Some(CollapsibleDef {
                    direction: CollapseDirection::Up,
                    offset: 20,
                }),
                ..make_popup(DRAWER, "Drawer", Rect::new(0, 600, 1024, 168))
            },
            SubPageDef {
                timeout: 30,
                ..make_popup(TOAST, "Toast", Rect::new(800, 700, 200, 50))
            },
            SubPageDef {
                modal: true,
                ..make_popup(MODAL, "Modal", Rect::new(600, 0, 100, 100))
            },
            make_popup(OVERLAY, "Overlay", Rect::new(350, 350, 100, 100)),
        ],
        ..ProjectDef::default()
    }
}

struct Fixture {
    pm: PageManager,
    link: Arc<RecordingLink>,
    surface: Arc<RecordingSurface>,
}

impl Fixture {
    fn run(&mut self, line: &str) -> CommandResult {
        self.pm.execute(0, 1, line)
    }

    fn z_of(&self, id: u16) -> i32 {
        self.pm.subpage(id).map(|s| s.z.0).unwrap_or(-1)
    }

    fn is_visible(&self, id: u16) -> bool {
        self.pm.subpage(id).map(|s| s.visible).unwrap_or(false)
    }

    fn click(&mut self, x: i32, y: i32) {
        self.pm.mouse_event(ClickEvent::Coordinates { x, y, pressed: true });
        self.pm.mouse_event(ClickEvent::Coordinates { x, y, pressed: false });
    }
}

fn make_fixture() -> Fixture {
    let resources = ProjectResources::new(make_project()).unwrap();
    let link = Arc::new(RecordingLink::new());
    let surface = Arc::new(RecordingSurface::new());
    let mut pm = PageManager::new(
        Arc::new(resources),
        link.clone(),
        surface.clone(),
        SystemSettings::default(),
    );
    pm.start().unwrap();
    surface.take();
    link.take();
    Fixture { pm, link, surface }
}

fn button(pm: &PageManager, parent: u16, index: u16) -> &crate::panel::Button {
    pm.button(ButtonHandle::new(parent, index)).unwrap()
}

fn customs(link: &RecordingLink) -> Vec<(u16, u16, CustomEvent)> {
    link.take()
        .into_iter()
        .filter_map(|c| match c.message {
            Message::Custom(ev) => Some((c.port, c.channel, ev)),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Pages
// ============================================================================

#[test]
fn test_start_shows_power_up_page() {
    let fx = make_fixture();
    let snapshot = fx.pm.snapshot();
    assert_eq!(snapshot.actual_page.as_deref(), Some("Main"));
    assert_eq!(snapshot.previous_page, None);
    assert!(snapshot.visible_popups.is_empty());
}

#[test]
fn test_navigating_to_active_page_is_noop() {
    let mut fx = make_fixture();
    fx.run("PAGE-Main").unwrap();
    assert!(fx.surface.take().is_empty());
    assert_eq!(fx.pm.pages().len(), 1);
    assert_eq!(fx.pm.previous_page_id(), None);
}

#[test]
fn test_page_flip_records_previous() {
    let mut fx = make_fixture();
    fx.run("PAGE-Second").unwrap();

    let calls = fx.surface.take();
    assert!(calls.contains(&SurfaceCall::DropPage(MAIN)));
    assert!(calls.contains(&SurfaceCall::SetPage(SECOND)));
    let snapshot = fx.pm.snapshot();
    assert_eq!(snapshot.actual_page.as_deref(), Some("Second"));
    assert_eq!(snapshot.previous_page.as_deref(), Some("Main"));

    assert!(matches!(fx.run("PAGE-Nowhere"), Err(CommandError::PageNotFound(_))));
    assert_eq!(fx.pm.snapshot().actual_page.as_deref(), Some("Second"));
}

#[test]
fn test_unknown_command() {
    let mut fx = make_fixture();
    assert_eq!(
        fx.run("FOO-1"),
        Err(CommandError::UnknownCommand("FOO".into()))
    );
    assert_eq!(fx.pm.snapshot().dispatched, 0);
}

// ============================================================================
// Popups
// ============================================================================

#[test]
fn test_group_keeps_one_popup_visible() {
    let mut fx = make_fixture();
    for name in ["A", "B", "C"] {
        fx.run(&format!("@PPN-{}", name)).unwrap();
    }

    assert!(!fx.is_visible(500));
    assert!(!fx.is_visible(501));
    assert_eq!(
        fx.pm.snapshot().visible_popups,
        vec![("C".to_string(), MAIN, 1)]
    );
    let calls = fx.surface.take();
    assert!(calls.contains(&SurfaceCall::DropSubPage { id: 500, parent: MAIN }));
    assert!(calls.contains(&SurfaceCall::DropSubPage { id: 501, parent: MAIN }));
}

#[test]
fn test_z_order_grows_until_reset() {
    let mut fx = make_fixture();
    fx.run("@PPN-Dialog").unwrap();
    fx.run("@PPN-Overlay").unwrap();
    fx.run("@PPN-Toast").unwrap();
    assert_eq!((fx.z_of(DIALOG), fx.z_of(OVERLAY), fx.z_of(TOAST)), (1, 2, 3));

    // hiding below the top keeps the counter
    fx.run("@PPF-Overlay").unwrap();
    fx.run("@PPN-Drawer").unwrap();
    assert_eq!(fx.z_of(DRAWER), 4);

    fx.run("@PPX").unwrap();
    assert!(fx.pm.snapshot().visible_popups.is_empty());
    fx.run("@PPN-Dialog").unwrap();
    assert_eq!(fx.z_of(DIALOG), 1);

    fx.run("@PPN-Overlay").unwrap();
    fx.run("@PPA").unwrap();
    fx.run("@PPN-Overlay").unwrap();
    assert_eq!(fx.z_of(OVERLAY), 1);
}

#[test]
fn test_popup_aliases_behave_the_same() {
    let mut canonical = make_fixture();
    canonical.run("^PPN-Dialog").unwrap();
    let mut legacy = make_fixture();
    legacy.run("PPON-Dialog").unwrap();

    assert_eq!(canonical.surface.take(), legacy.surface.take());
    assert_eq!(canonical.pm.snapshot(), legacy.pm.snapshot());
}

#[test]
fn test_popup_without_host_page() {
    let mut fx = make_fixture();
    fx.pm.reset();
    assert_eq!(
        fx.run("@PPN-Dialog"),
        Err(CommandError::NoParentPage("Dialog".into()))
    );
    assert!(!fx.is_visible(DIALOG));

    assert!(matches!(fx.run("@PPN-Missing"), Err(CommandError::SubPageNotFound(_))));
}

#[test]
fn test_popup_on_named_page_is_drawn_later() {
    let mut fx = make_fixture();
    fx.run("@PPN-Dialog;Second").unwrap();
    assert!(fx.is_visible(DIALOG));
    assert!(!fx
        .surface
        .take()
        .iter()
        .any(|c| matches!(c, SurfaceCall::SetSubPage { .. })));

    fx.run("PAGE-Second").unwrap();
    assert!(fx
        .surface
        .take()
        .contains(&SurfaceCall::SetSubPage { id: DIALOG, parent: SECOND, z: 1 }));
}

#[test]
fn test_reshow_raises_overlapped_popup() {
    let mut fx = make_fixture();
    fx.run("@PPN-Dialog").unwrap();
    fx.run("@PPN-Overlay").unwrap();
    fx.surface.take();

    fx.run("@PPN-Dialog").unwrap();
    assert_eq!(fx.z_of(DIALOG), 3);
    assert_eq!(
        fx.surface.take(),
        vec![SurfaceCall::RaiseSubPage { id: DIALOG, z: 3 }]
    );

    // a surface that cannot raise gets the popup redrawn
    fx.run("@PPN-Overlay").unwrap();
    fx.surface.take();
    fx.surface.set_can_raise(false);
    fx.run("@PPN-Dialog").unwrap();
    let calls = fx.surface.take();
    assert!(calls.contains(&SurfaceCall::DropSubPage { id: DIALOG, parent: MAIN }));
    assert!(calls.contains(&SurfaceCall::SetSubPage { id: DIALOG, parent: MAIN, z: 5 }));
}

#[test]
fn test_popup_timeout_uses_show_generation() {
    let mut fx = make_fixture();
    fx.run("@PPN-Toast").unwrap();
    let first = fx.pm.take_timers();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].delay(), Duration::from_millis(3000));

    // showing again restarts the timeout
    fx.run("@PPN-Toast").unwrap();
    let second = fx.pm.take_timers();
    assert_eq!(second.len(), 1);

    fx.pm.on_timer(first[0]);
    assert!(fx.is_visible(TOAST));
    fx.pm.on_timer(second[0]);
    assert!(!fx.is_visible(TOAST));
}

#[test]
fn test_collapsible_rule_table() {
    let mut fx = make_fixture();
    let state = |fx: &Fixture| {
        let c = fx.pm.subpage(DRAWER).and_then(|s| s.collapsible).unwrap();
        (c.state, c.dynamic_offset)
    };
    let rules = "^PCT-Drawer;c->o,o->d100,*->c";

    // hidden popups ignore collapse requests
    fx.run(rules).unwrap();
    assert_eq!(state(&fx), (CollapseState::Closed, None));

    fx.run("@PPN-Drawer").unwrap();
    assert_eq!(state(&fx), (CollapseState::Small, None));
    fx.surface.take();

    fx.run(rules).unwrap();
    assert_eq!(state(&fx), (CollapseState::Full, None));
    fx.run(rules).unwrap();
    assert_eq!(state(&fx), (CollapseState::Full, Some(100)));
    fx.run(rules).unwrap();
    assert_eq!(state(&fx), (CollapseState::Small, None));
    assert_eq!(
        fx.surface.take(),
        vec![
            SurfaceCall::Collapse { id: DRAWER, state: CollapseState::Full, offset: None },
            SurfaceCall::Collapse { id: DRAWER, state: CollapseState::Full, offset: Some(100) },
            SurfaceCall::Collapse { id: DRAWER, state: CollapseState::Small, offset: None },
        ]
    );

    fx.run("^PCO-Drawer").unwrap();
    assert_eq!(state(&fx), (CollapseState::Full, None));
    fx.run("^PCL-Drawer").unwrap();
    assert_eq!(state(&fx), (CollapseState::Small, None));

    fx.run("@PPN-Dialog").unwrap();
    assert!(matches!(
        fx.run("^PCT-Dialog"),
        Err(CommandError::InvalidParameter { .. })
    ));
}

// ============================================================================
// Buttons
// ============================================================================

#[test]
fn test_fill_color_query_reply() {
    let mut fx = make_fixture();
    fx.run("^BCF-30,0,#FF0000").unwrap();
    assert!(fx.link.sent().is_empty());

    fx.run("?BCF-30,1").unwrap();
    let replies = customs(&fx.link);
    assert_eq!(replies.len(), 1);
    let (port, channel, event) = &replies[0];
    assert_eq!((*port, *channel), (1, 30));
    assert_eq!(event.event_type, EVENT_FILL_COLOR);
    assert_eq!(event.instance, 1);
    assert_eq!(event.text, "FF0000");
}

#[test]
fn test_channel_on_reaches_only_matching_buttons() {
    let mut fx = make_fixture();
    fx.run("ON-10").unwrap();

    assert!(button(&fx.pm, MAIN, 1).is_on());
    // resolution loads the second page's button lazily
    assert!(button(&fx.pm, SECOND, 1).is_on());
    assert!(fx.pm.page(OTHER).is_none());

    fx.run("PAGE-Other").unwrap();
    assert!(!button(&fx.pm, OTHER, 1).is_on());

    fx.run("OFF-10").unwrap();
    assert!(!button(&fx.pm, MAIN, 1).is_on());
    assert!(!button(&fx.pm, SECOND, 1).is_on());
}

#[test]
fn test_channel_on_for_page_not_shown() {
    let mut fx = make_fixture();
    fx.run("ON-11").unwrap();
    fx.run("PAGE-Other").unwrap();
    assert!(button(&fx.pm, OTHER, 1).is_on());
}

#[test]
fn test_inverted_bargraph_level() {
    let mut fx = make_fixture();
    fx.run("LEVEL-3,30").unwrap();

    let volume = button(&fx.pm, MAIN, 2);
    assert_eq!(volume.level_value, 30);
    assert_eq!(volume.rendered_level(), 70);
    assert_eq!(
        fx.link.take(),
        vec![OutboundCommand::new(1, 3, Message::Level(30))]
    );
    assert!(fx.surface.take().contains(&SurfaceCall::DisplayButton {
        handle: ButtonHandle::new(MAIN, 2),
        instance: 1
    }));

    fx.run("LEVEL-3,42.6").unwrap();
    assert_eq!(button(&fx.pm, MAIN, 2).level_value, 43);
}

#[test]
fn test_on_without_parameters_changes_nothing() {
    let mut fx = make_fixture();
    let before = fx.pm.snapshot();
    assert!(matches!(fx.run("ON"), Err(CommandError::MissingParameters { .. })));
    assert!(matches!(fx.run("ON-"), Err(CommandError::MissingParameters { .. })));
    assert!(fx.surface.take().is_empty());
    assert!(fx.link.take().is_empty());
    assert_eq!(fx.pm.pages().len(), 1);
    assert_eq!(fx.pm.snapshot().actual_page, before.actual_page);
}

#[test]
fn test_unresolved_address() {
    let mut fx = make_fixture();
    assert_eq!(
        fx.run("^TXT-99,0,Hi"),
        Err(CommandError::UnresolvedButton { port: 1, channel: 99 })
    );
}

#[test]
fn test_fragmented_string_dispatches_once() {
    let mut fx = make_fixture();
    let head = "^TXT-30,0,";
    let mut first = head.as_bytes().to_vec();
    first.resize(STRING_BUFFER_SIZE, b'x');
    let fragment = |content: Vec<u8>, is_final| {
        ProtocolEvent::String(StringMessage {
            device: 0,
            port: 1,
            content,
            is_final_fragment: is_final,
            is_internal_utf8: false,
        })
    };

    fx.pm.deliver(fragment(first, false));
    assert_eq!(fx.pm.snapshot().dispatched, 0);
    fx.pm.deliver(fragment(b"yz".to_vec(), false));
    assert_eq!(fx.pm.snapshot().dispatched, 1);

    let text = &button(&fx.pm, MAIN, 3).instances[0].text;
    assert_eq!(text.len(), STRING_BUFFER_SIZE - head.len() + 2);
    assert!(text.ends_with("xyz"));
}

#[test]
fn test_modify_and_unicode_text() {
    let mut fx = make_fixture();
    fx.run("^BMF-30,0,%TAbc%CF#00FF00").unwrap();
    let label = button(&fx.pm, MAIN, 3);
    assert!(label.instances.iter().all(|i| i.text == "Abc"));
    assert_eq!(label.instances[1].fill_color.to_hex(), "00FF00");

    fx.run("^UNI-30,2,00480069").unwrap();
    let label = button(&fx.pm, MAIN, 3);
    assert_eq!(label.instances[0].text, "Abc");
    assert_eq!(label.instances[1].text, "Hi");
}

// ============================================================================
// Touch
// ============================================================================

#[test]
fn test_click_sends_push_and_release() {
    let mut fx = make_fixture();
    fx.click(10, 10);
    assert_eq!(
        fx.link.take(),
        vec![
            OutboundCommand::new(1, 10, Message::Push),
            OutboundCommand::new(1, 10, Message::Release),
        ]
    );

    fx.run("@PPN-Dialog").unwrap();
    fx.click(310, 310);
    assert_eq!(
        fx.link.take(),
        vec![
            OutboundCommand::new(1, 50, Message::Push),
            OutboundCommand::new(1, 50, Message::Release),
        ]
    );

    // empty popup area does not fall through to the page
    fx.click(450, 450);
    assert!(fx.link.take().is_empty());
}

#[test]
fn test_modal_popup_blocks_clicks_below() {
    let mut fx = make_fixture();
    fx.run("@PPN-Dialog").unwrap();
    fx.run("@PPN-Modal").unwrap();

    assert_eq!(fx.pm.resolve_click(10, 10), None);
    assert_eq!(fx.pm.resolve_click(310, 310), None);
    fx.click(10, 10);
    assert!(fx.link.take().is_empty());

    fx.run("@PPF-Modal").unwrap();
    assert_eq!(
        fx.pm.resolve_click(310, 310),
        Some((ButtonHandle::new(DIALOG, 1), 10, 10))
    );
}

#[test]
fn test_page_flip_runs_on_release() {
    let mut fx = make_fixture();
    fx.pm.mouse_event(ClickEvent::Coordinates { x: 410, y: 10, pressed: true });
    assert!(!fx.is_visible(DIALOG));
    fx.pm.mouse_event(ClickEvent::Coordinates { x: 410, y: 10, pressed: false });
    assert!(fx.is_visible(DIALOG));
}

fn levels_sent(link: &RecordingLink) -> Vec<i32> {
    link.take()
        .into_iter()
        .filter_map(|c| match c.message {
            Message::Level(v) if (c.port, c.channel) == (1, 3) => Some(v),
            _ => None,
        })
        .collect()
}

#[test]
fn test_bargraph_touch_ramps_in_increments() {
    let mut fx = make_fixture();
    let volume = ButtonHandle::new(MAIN, 2);

    // 10 px above the bottom of an inverted 0..100 slider
    fx.pm.mouse_event(ClickEvent::Coordinates { x: 10, y: 190, pressed: true });
    assert_eq!(levels_sent(&fx.link), vec![2]);
    assert_eq!(button(&fx.pm, MAIN, 2).level_value, 2);

    let mut steps = 0;
    let mut timers = fx.pm.take_timers();
    while let Some(timer) = timers.pop() {
        assert!(matches!(
            timer,
            TimerRequest::LevelRamp { handle, delay, .. }
                if handle == volume && delay == Duration::from_millis(40)
        ));
        fx.pm.on_timer(timer);
        steps += 1;
        timers.extend(fx.pm.take_timers());
    }
    assert_eq!(steps, 44);
    let sent = levels_sent(&fx.link);
    assert_eq!(sent.len(), 44);
    assert!(sent.windows(2).all(|w| w[1] - w[0] == 2));
    assert_eq!(sent.last(), Some(&90));
    assert_eq!(button(&fx.pm, MAIN, 2).ramp, None);
}

#[test]
fn test_controller_level_cancels_touch_ramp() {
    let mut fx = make_fixture();
    fx.run("^GDI-20,10").unwrap();
    fx.pm.mouse_event(ClickEvent::Coordinates { x: 10, y: 190, pressed: true });
    assert_eq!(levels_sent(&fx.link), vec![10]);

    fx.run("LEVEL-3,50").unwrap();
    fx.link.take();
    for timer in fx.pm.take_timers() {
        fx.pm.on_timer(timer);
    }
    assert!(fx.link.take().is_empty());
    assert_eq!(button(&fx.pm, MAIN, 2).level_value, 50);

    // without a ramp time the quantized level applies at once
    fx.run("^GRU-20,0").unwrap();
    fx.pm.mouse_event(ClickEvent::Coordinates { x: 10, y: 100, pressed: false });
    fx.pm.mouse_event(ClickEvent::Coordinates { x: 10, y: 174, pressed: true });
    assert_eq!(levels_sent(&fx.link), vec![70]);
    assert!(fx.pm.take_timers().is_empty());
}

// ============================================================================
// Subviews and system pages
// ============================================================================

#[test]
fn test_subview_items_and_events() {
    let mut fx = make_fixture();
    let viewer = ButtonHandle::new(MAIN, 5);

    fx.run("^SSH-60,A").unwrap();
    assert_eq!(fx.pm.take_subview_updates(), vec![viewer]);
    fx.pm.process_subview_update(viewer);
    assert_eq!(
        fx.surface.take(),
        vec![SurfaceCall::SubViewItems { handle: viewer, visible: vec!["A".into()] }]
    );
    assert!(fx.link.take().is_empty());

    fx.run("^SCE-60,0,2001,2002,0").unwrap();
    fx.run("^SHD-60,A").unwrap();
    let events = customs(&fx.link);
    assert_eq!(events.len(), 1);
    let (port, channel, event) = &events[0];
    assert_eq!((*port, *channel), (1, 60));
    assert_eq!((event.event_type, event.value1, event.text.as_str()), (2002, 1, "A"));

    assert!(matches!(fx.run("^SSH-60,Nope"), Err(CommandError::SubPageNotFound(_))));
}

#[test]
fn test_anchored_show_reorders_and_fires_events() {
    let mut fx = make_fixture();
    let viewer = ButtonHandle::new(MAIN, 5);
    fx.run("^SCE-60,2000,2001,2002,2003").unwrap();
    fx.run("^SSH-60,B,1,0").unwrap();

    let events: Vec<_> = customs(&fx.link)
        .into_iter()
        .map(|(_, _, e)| (e.event_type, e.value1, e.value2, e.text))
        .collect();
    assert_eq!(
        events,
        vec![
            (2003, 1, 2, "B".to_string()),
            (2001, 1, 0, "B".to_string()),
            (2000, 1, 0, "B".to_string()),
        ]
    );
    let subview = button(&fx.pm, MAIN, 5).subview.as_ref().unwrap();
    let order: Vec<_> = subview.items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(order, vec!["B", "A"]);
    assert_eq!(subview.anchor.as_deref(), Some("B"));
    assert_eq!(fx.pm.take_subview_updates(), vec![viewer]);

    // position 0 keeps the place; an already visible item only re-anchors
    fx.run("^SSH-60,B,0,15").unwrap();
    let events = customs(&fx.link);
    assert_eq!(events.len(), 1);
    assert_eq!((events[0].2.event_type, events[0].2.value2), (2000, 15));
}

#[test]
fn test_subview_edit_is_all_or_nothing() {
    let mut fx = make_fixture();
    fx.run("^SSH-60,A").unwrap();
    fx.run("^SCE-60,0,2001,2002,0").unwrap();
    fx.pm.take_subview_updates();
    fx.link.take();

    // the label at address 30 is no subpage view
    assert!(matches!(fx.run("^SHD-60&30,A"), Err(CommandError::InvalidParameter { .. })));
    let subview = button(&fx.pm, MAIN, 5).subview.as_ref().unwrap();
    assert!(subview.items[0].visible);
    assert!(fx.link.take().is_empty());
    assert!(fx.pm.take_subview_updates().is_empty());
}

#[test]
fn test_setup_page_shows_live_settings() {
    let mut fx = make_fixture();
    fx.run("SETUP").unwrap();
    assert_eq!(fx.pm.snapshot().actual_page.as_deref(), Some("Setup"));
    assert_eq!(button(&fx.pm, SETUP_PAGE, 1).instances[0].text, "100%");

    let settings = SystemSettings {
        volume: 40,
        ..fx.pm.settings().clone()
    };
    let generation = fx.pm.settings_generation();
    fx.pm.update_settings(settings);
    assert_eq!(fx.pm.settings_generation(), generation + 1);
    assert_eq!(button(&fx.pm, SETUP_PAGE, 1).instances[0].text, "40%");

    // the exit channel returns to the page shown before setup
    fx.click(10, 10);
    let snapshot = fx.pm.snapshot();
    assert_eq!(snapshot.actual_page.as_deref(), Some("Main"));
    assert!(fx.link.take().is_empty());
}

#[test]
fn test_setup_log_level_toggle() {
    let mut fx = make_fixture();
    fx.run("SETUP").unwrap();
    assert_eq!(button(&fx.pm, SETUP_PAGE, 4).instances[0].text, "info");
    assert!(!button(&fx.pm, SETUP_PAGE, 3).is_on());

    let generation = fx.pm.settings_generation();
    fx.click(10, 310);
    assert_eq!(fx.pm.settings().log_level, "debug");
    assert_eq!(fx.pm.settings_generation(), generation + 1);
    assert_eq!(button(&fx.pm, SETUP_PAGE, 4).instances[0].text, "debug");
    assert!(button(&fx.pm, SETUP_PAGE, 3).is_on());

    // selecting the active level again changes nothing
    fx.click(10, 310);
    assert_eq!(fx.pm.settings_generation(), generation + 1);
    assert!(fx.link.take().is_empty());
}

fn logout_timer(pm: &mut PageManager) -> Option<TimerRequest> {
    pm.take_timers()
        .into_iter()
        .filter(|t| matches!(t, TimerRequest::Logout { .. }))
        .last()
}

#[test]
fn test_protected_flip_waits_for_password() {
    let mut fx = make_fixture();
    fx.run("@PWD-2,1988").unwrap();
    fx.run("^LPS-30").unwrap();
    if let Some(go) = fx.pm.button_mut(ButtonHandle::new(MAIN, 4)) {
        go.page_flips[0].password = 2;
    }

    fx.click(410, 10);
    assert!(!fx.is_visible(DIALOG));
    assert!(fx.surface.take().contains(&SurfaceCall::ShowKeyboard {
        text: String::new(),
        private: true
    }));

    assert!(!fx.pm.login(None, "wrong"));
    assert!(!fx.is_visible(DIALOG));
    assert!(fx.pm.login(None, "1988"));
    assert!(fx.is_visible(DIALOG));

    let timer = logout_timer(&mut fx.pm).unwrap();
    assert_eq!(timer.delay(), Duration::from_secs(30));
    fx.pm.on_timer(timer);
    assert!(!fx.pm.is_logged_in());

    fx.run("@PPF-Dialog").unwrap();
    fx.click(410, 10);
    assert!(!fx.is_visible(DIALOG));
}

#[test]
fn test_user_login_renewed_by_activity() {
    let mut fx = make_fixture();
    fx.run("@PWD-1,1234").unwrap();
    fx.run("^LPS-10").unwrap();
    fx.run("^LPB-admin,secret").unwrap();
    if let Some(go) = fx.pm.button_mut(ButtonHandle::new(MAIN, 4)) {
        go.page_flips[0].password = 1;
    }

    assert!(!fx.pm.login(Some("admin"), "1234"));
    assert!(fx.pm.login(Some("admin"), "secret"));
    let first = logout_timer(&mut fx.pm).unwrap();

    // the press restarts the timer, so the first expiry is stale
    fx.click(410, 10);
    assert!(fx.is_visible(DIALOG));
    let second = logout_timer(&mut fx.pm).unwrap();
    fx.pm.on_timer(first);
    assert!(fx.pm.is_logged_in());
    fx.pm.on_timer(second);
    assert!(!fx.pm.is_logged_in());

    assert!(fx.pm.login(Some("admin"), "secret"));
    fx.run("^LPR-admin").unwrap();
    assert!(!fx.pm.is_logged_in());
}

#[test]
fn test_shutdown_stops_manager() {
    let mut fx = make_fixture();
    fx.run("SHUTDOWN").unwrap();
    assert!(fx.pm.is_stopped());
    assert_eq!(fx.surface.take(), vec![SurfaceCall::Shutdown]);
}
