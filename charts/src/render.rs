use anyhow::Result;
use chrono::NaiveDateTime;
use itertools::Itertools as _;
use maud::{html, Markup, PreEscaped, DOCTYPE};
use plotters::{element::Pie, prelude::*};
use qstats_data::charts::{Rgb, Slice, Wedge};

const FONT_FAMILY: &str = "sans-serif";
const PIE_SIZE: (u32, u32) = (640, 480);
const BAR_SIZE: (u32, u32) = (640, 480);

const STYLE: &str = r#"
body { font-family: sans-serif; margin: 2em; }
.tabs { display: flex; flex-wrap: wrap; }
.tabs > label { order: 1; padding: .5em 1.5em; cursor: pointer; background: #eee; border: 1px solid #ccc; }
.tabs > .tab { order: 99; flex-grow: 1; width: 100%; display: none; padding: 1em; border-top: 1px solid #ccc; }
.tabs > input[type=radio] { display: none; }
.tabs > input[type=radio]:checked + label { background: #fff; font-weight: bold; }
.tabs > input[type=radio]:checked + label + .tab { display: block; }
.charts { display: flex; flex-wrap: wrap; gap: 2em; }
"#;

fn color(rgb: Rgb) -> RGBColor {
    RGBColor(rgb.0, rgb.1, rgb.2)
}

/// Running slots of one queue as a pie, wedges in the order given and labelled with their share
/// of the queue. Empty wedges are left out, `None` if nothing is left.
pub fn pie_svg(queue: &str, wedges: &[&Wedge]) -> Result<Option<String>> {
    let wedges = wedges.iter().filter(|wedge| wedge.slice.njobs > 0).collect_vec();
    if wedges.is_empty() {
        return Ok(None);
    }
    let sizes = wedges.iter().map(|wedge| wedge.slice.njobs as f64).collect_vec();
    let colors = wedges.iter().map(|wedge| color(wedge.slice.color)).collect_vec();
    let labels = wedges
        .iter()
        .map(|wedge| format!("{} ({:.1}%)", wedge.slice.name, wedge.prct()))
        .collect_vec();

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, PIE_SIZE).into_drawing_area();
        root.fill(&WHITE)?;
        let root = root.titled(&format!("Running in {queue}"), (FONT_FAMILY, 24))?;

        let (width, height) = root.dim_in_pixel();
        let center = (width as i32 / 2, height as i32 / 2);
        let radius = f64::from(width.min(height)) * 0.3;
        let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
        pie.start_angle(-90.);
        pie.label_style((FONT_FAMILY, 14).into_font().color(&BLACK));
        root.draw(&pie)?;
        root.present()?;
    }
    Ok(Some(svg))
}

/// Queued slots per owner as bars, in the order given. `None` without bars.
pub fn bars_svg(queue: &str, bars: &[&Slice]) -> Result<Option<String>> {
    let Some(max) = bars.iter().map(|bar| bar.njobs).max() else {
        return Ok(None);
    };

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, BAR_SIZE).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(format!("Queued in {queue}"), (FONT_FAMILY, 24))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d((0..bars.len()).into_segmented(), 0u64..(max + max / 10 + 1))?;

        let label = |value: &SegmentValue<usize>| match value {
            SegmentValue::CenterOf(index) => bars.get(*index).map(|bar| bar.name.clone()).unwrap_or_default(),
            _ => String::new(),
        };
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(bars.len())
            .x_label_formatter(&label)
            .y_desc("slots")
            .label_style((FONT_FAMILY, 14))
            .draw()?;

        chart.draw_series(bars.iter().enumerate().map(|(index, bar)| {
            let mut rectangle = Rectangle::new(
                [(SegmentValue::Exact(index), 0), (SegmentValue::Exact(index + 1), bar.njobs)],
                color(bar.color).filled(),
            );
            rectangle.set_margin(0, 0, 5, 5);
            rectangle
        }))?;
        root.present()?;
    }
    Ok(Some(svg))
}

/// What one tab of the page shows.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueTab {
    pub queue: String,
    pub running: Option<String>,
    pub queued: Option<String>,
}

impl QueueTab {
    pub fn new(queue: &str, wedges: &[Wedge], bars: &[Slice]) -> Result<Self> {
        let wedges = wedges.iter().filter(|wedge| wedge.slice.queue == queue).collect_vec();
        let bars = bars.iter().filter(|bar| bar.queue == queue).collect_vec();
        Ok(QueueTab {
            queue: queue.to_owned(),
            running: pie_svg(queue, &wedges)?,
            queued: bars_svg(queue, &bars)?,
        })
    }
}

fn chart(svg: Option<&str>, empty: &str) -> Markup {
    html! {
        @match svg {
            Some(svg) => div class="chart" { (PreEscaped(svg)) },
            None => p class="empty" { (empty) },
        }
    }
}

/// The whole page, one radio-button tab per queue with the first one open.
pub fn page(tabs: &[QueueTab], generated: NaiveDateTime) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { "Queue usage" }
                style { (PreEscaped(STYLE)) }
            }
            body {
                h1 { "Queue usage" }
                p { "Generated " (generated.format("%Y-%m-%d %H:%M:%S")) }
                div class="tabs" {
                    @for (index, tab) in tabs.iter().enumerate() {
                        @let id = format!("tab-{index}");
                        input type="radio" name="queues" id=(id) checked[index == 0];
                        label for=(id) { (tab.queue) }
                        div class="tab" {
                            div class="charts" {
                                (chart(tab.running.as_deref(), "Nothing running"))
                                (chart(tab.queued.as_deref(), "Nothing queued"))
                            }
                        }
                    }
                }
            }
        }
    }
}

#[allow(non_snake_case)]
#[cfg(test)]
mod test {
    use chrono::NaiveDate;
    use qstats_data::charts::{FREE_COLOR, FREE_NAME, FREE_OWNER, PALETTE};

    use super::*;

    fn slice(queue: &str, owner: &str, njobs: u64) -> Slice {
        Slice {
            queue: queue.into(),
            owner: owner.into(),
            name: owner.to_uppercase(),
            color: PALETTE[0],
            njobs,
        }
    }

    fn wedge(queue: &str, owner: &str, njobs: u64, frac: f64) -> Wedge {
        Wedge {
            slice: slice(queue, owner, njobs),
            frac,
        }
    }

    fn generated() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 3, 1)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap_or_default()
    }

    #[test]
    fn pie_svg__skips_empty_wedges() -> Result<()> {
        let free = Wedge {
            slice: Slice {
                queue: "hep.q".into(),
                owner: FREE_OWNER.into(),
                name: FREE_NAME.into(),
                color: FREE_COLOR,
                njobs: 0,
            },
            frac: 0.,
        };
        assert_eq!(pie_svg("hep.q", &[&free])?, None);

        let alice = wedge("hep.q", "alice", 3, 1.);
        let svg = pie_svg("hep.q", &[&alice, &free])?.unwrap_or_default();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("ALICE (100.0%)"));
        assert!(!svg.contains(FREE_NAME));
        Ok(())
    }

    #[test]
    fn pie_svg__labels_show_queue_share() -> Result<()> {
        let (alice, bob) = (wedge("hep.q", "alice", 1, 1. / 3.), wedge("hep.q", "bob", 2, 2. / 3.));
        let svg = pie_svg("hep.q", &[&alice, &bob])?.unwrap_or_default();
        assert!(svg.contains("ALICE (33.3%)"));
        assert!(svg.contains("BOB (66.7%)"));
        assert!(!svg.contains("ALICE (1)"));
        Ok(())
    }

    #[test]
    fn bars_svg__one_bar_per_owner() -> Result<()> {
        assert_eq!(bars_svg("gpu.q", &[])?, None);

        let (bob, carol) = (slice("gpu.q", "bob", 5), slice("gpu.q", "carol", 2));
        let svg = bars_svg("gpu.q", &[&bob, &carol])?.unwrap_or_default();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Queued in gpu.q"));
        Ok(())
    }

    #[test]
    fn QueueTab__only_its_queue() -> Result<()> {
        let wedges = [wedge("hep.q", "alice", 1, 1.)];
        let bars = [slice("hep.q", "bob", 1)];
        let hep = QueueTab::new("hep.q", &wedges, &bars)?;
        assert!(hep.running.is_some() && hep.queued.is_some());

        let fw = QueueTab::new("fw.q", &wedges, &bars)?;
        assert_eq!((fw.running, fw.queued), (None, None));
        Ok(())
    }

    #[test]
    fn page__tab_per_queue_first_checked() {
        let tabs = ["hep.q", "gpu.q", "fw.q"].map(|queue| QueueTab {
            queue: queue.into(),
            running: None,
            queued: Some("<svg id=\"bars\"></svg>".into()),
        });
        let html = page(&tabs, generated()).into_string();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert_eq!(html.matches("type=\"radio\"").count(), 3);
        assert_eq!(html.matches(" checked>").count(), 1);
        assert!(html.find(" checked>") < html.find("gpu.q"));
        assert_eq!(html.matches("Nothing running").count(), 3);
        assert_eq!(html.matches("<svg id=\"bars\">").count(), 3);
        assert!(html.contains("2020-03-01 12:00:00"));
    }
}
