use std::collections::BTreeMap;

use eframe::egui::{Align2, Color32, RichText, Ui};
use egui_plot::{Bar, BarChart, Legend, MarkerShape, Plot, PlotPoint, PlotPoints, Points, Text};

use crate::color::{generate_palette, ColorMap};
use crate::data::aggregate::AggregatedSeries;
use crate::data::model::{station_label, StationKey};
use crate::data::pipeline::ScatterData;
use crate::state::Session;

const CHART_HEIGHT: f32 = 320.0;

/// Group `(station, [x, y])` pairs per station, in table order within each.
fn by_station(
    items: impl Iterator<Item = (StationKey, [f64; 2])>,
) -> BTreeMap<StationKey, Vec<[f64; 2]>> {
    let mut groups: BTreeMap<StationKey, Vec<[f64; 2]>> = BTreeMap::new();
    for (station, point) in items {
        groups.entry(station).or_default().push(point);
    }
    groups
}

// ---------------------------------------------------------------------------
// Station map
// ---------------------------------------------------------------------------

/// Station coordinates as triangles with the station name above each one.
pub fn station_map(ui: &mut Ui, session: &Session) {
    let map = &session.evaluation.map;
    let Some((cx, cy)) = map.center else {
        ui.label("Nenhuma estação com coordenadas no filtro atual.");
        return;
    };

    let groups = by_station(map.points.iter().map(|p| (p.station.clone(), [p.x, p.y])));

    Plot::new("station_map")
        .height(CHART_HEIGHT)
        .data_aspect(1.0)
        .x_axis_label(&session.table.columns.x)
        .y_axis_label(&session.table.columns.y)
        .legend(Legend::default())
        .show(ui, |plot_ui| {
            for (station, coords) in groups {
                let color = session.station_colors.color_for(&station);
                let label = station_label(&station);
                let [lx, ly] = coords[0];

                plot_ui.points(
                    Points::new(PlotPoints::from(coords))
                        .name(&label)
                        .shape(MarkerShape::Up)
                        .filled(true)
                        .radius(6.0)
                        .color(color),
                );
                plot_ui.text(
                    Text::new(PlotPoint::new(lx, ly), RichText::new(label).color(Color32::WHITE))
                        .anchor(Align2::CENTER_BOTTOM),
                );
            }
            plot_ui.points(
                Points::new(PlotPoints::from(vec![[cx, cy]]))
                    .shape(MarkerShape::Plus)
                    .radius(4.0)
                    .color(Color32::GRAY),
            );
        });
}

// ---------------------------------------------------------------------------
// Yearly bar chart
// ---------------------------------------------------------------------------

/// One bar per year, each year in its own colour.
pub fn yearly_bar_chart(ui: &mut Ui, series: &AggregatedSeries, year_column: &str) {
    if series.points.is_empty() {
        ui.label("Sem dados para o período e estações selecionados.");
        return;
    }

    ui.label(format!("Variação do {} ao longo dos anos", series.parameter));
    let colors = generate_palette(series.points.len());
    let bars: Vec<Bar> = series
        .points
        .iter()
        .zip(colors)
        .filter_map(|(point, color)| {
            let mean = point.mean?;
            Some(
                Bar::new(point.year, mean)
                    .width(0.6)
                    .fill(color)
                    .name(format!("{} (n = {})", point.year, point.count)),
            )
        })
        .collect();

    Plot::new("yearly_bars")
        .height(CHART_HEIGHT)
        .x_axis_label(year_column)
        .y_axis_label(&series.parameter)
        .allow_drag(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name(&series.parameter));
        });
}

// ---------------------------------------------------------------------------
// Scatter plot
// ---------------------------------------------------------------------------

/// X-Y scatter coloured by station.
pub fn scatter_plot(ui: &mut Ui, scatter: &ScatterData, colors: &ColorMap) {
    ui.label(format!("{} vs {}", scatter.x_axis, scatter.y_axis));
    let groups = by_station(
        scatter
            .points
            .iter()
            .map(|p| (p.station.clone(), [p.x, p.y])),
    );

    Plot::new("scatter")
        .height(CHART_HEIGHT)
        .x_axis_label(&scatter.x_axis)
        .y_axis_label(&scatter.y_axis)
        .legend(Legend::default())
        .allow_boxed_zoom(true)
        .show(ui, |plot_ui| {
            for (station, coords) in groups {
                plot_ui.points(
                    Points::new(PlotPoints::from(coords))
                        .name(station_label(&station))
                        .radius(4.0)
                        .color(colors.color_for(&station)),
                );
            }
        });
}
