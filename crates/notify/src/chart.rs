use plotters::prelude::*;

use common::{Candle, ChartRenderer, Error, Result};

const BACKGROUND: RGBColor = RGBColor(0x16, 0x16, 0x16);
const UP: RGBColor = RGBColor(0x2f, 0xc7, 0x1e);
const DOWN: RGBColor = RGBColor(0xed, 0x2f, 0x1a);

/// Dark-background candlestick chart rendered in memory and encoded as PNG.
///
/// No text is drawn; the Telegram sink sends the title as the photo caption.
#[derive(Debug, Clone, Copy)]
pub struct CandleChart {
    width: u32,
    height: u32,
}

impl Default for CandleChart {
    fn default() -> Self {
        // 10:6, same ratio as the old scanner's charts
        Self::new(1000, 600)
    }
}

impl CandleChart {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl ChartRenderer for CandleChart {
    fn render(&self, symbol: &str, candles: &[Candle]) -> Result<Vec<u8>> {
        if candles.is_empty() || self.width == 0 || self.height == 0 {
            return Err(Error::Chart(format!("nothing to draw for {symbol}")));
        }
        let (low, high) = price_range(candles)
            .ok_or_else(|| Error::Chart(format!("non-finite prices for {symbol}")))?;

        let body_width = (self.width as usize * 6 / 10 / candles.len()).clamp(1, 40) as u32;
        let mut pixels = vec![0u8; self.width as usize * self.height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut pixels, (self.width, self.height))
                .into_drawing_area();
            root.fill(&BACKGROUND).map_err(chart_err)?;

            let mut chart = ChartBuilder::on(&root)
                .margin(16)
                .build_cartesian_2d(0..candles.len(), low..high)
                .map_err(chart_err)?;
            chart
                .draw_series(candles.iter().enumerate().map(|(i, c)| {
                    CandleStick::new(
                        i,
                        c.open,
                        c.high,
                        c.low,
                        c.close,
                        UP.filled(),
                        DOWN.filled(),
                        body_width,
                    )
                }))
                .map_err(chart_err)?;
            root.present().map_err(chart_err)?;
        }

        encode_png(&pixels, self.width, self.height)
    }
}

/// Lowest low and highest high, padded so a flat series still has a range.
fn price_range(candles: &[Candle]) -> Option<(f64, f64)> {
    let low = candles.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    let high = candles.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
    if !low.is_finite() || !high.is_finite() {
        return None;
    }
    let pad = if high > low {
        (high - low) * 0.05
    } else {
        high.abs().max(1.0) * 0.01
    };
    Some((low - pad, high + pad))
}

fn encode_png(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().map_err(chart_err)?;
        writer.write_image_data(pixels).map_err(chart_err)?;
        writer.finish().map_err(chart_err)?;
    }
    Ok(out)
}

fn chart_err(e: impl std::fmt::Display) -> Error {
    Error::Chart(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    fn bars(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let base = 100.0 + i as f64;
                Candle {
                    open_time: Utc.timestamp_opt(1_700_000_000, 0).unwrap()
                        + Duration::hours(4 * i as i64),
                    open: base,
                    high: base * 1.12,
                    low: base * 0.99,
                    close: if i % 2 == 0 { base * 1.05 } else { base * 0.995 },
                    volume: 1.0,
                }
            })
            .collect()
    }

    #[test]
    fn renders_png_of_requested_size() {
        let png = CandleChart::new(320, 200).render("BTC/USDT", &bars(50)).unwrap();

        assert_eq!(png[..8], PNG_SIGNATURE);
        // IHDR width and height, big-endian
        assert_eq!(u32::from_be_bytes([png[16], png[17], png[18], png[19]]), 320);
        assert_eq!(u32::from_be_bytes([png[20], png[21], png[22], png[23]]), 200);
    }

    #[test]
    fn flat_single_bar_still_renders() {
        let mut one = bars(1);
        one[0].high = 100.0;
        one[0].low = 100.0;
        one[0].open = 100.0;
        one[0].close = 100.0;
        assert!(CandleChart::new(64, 64).render("ETH/USDT", &one).is_ok());
    }

    #[test]
    fn empty_series_is_a_chart_error() {
        let err = CandleChart::default().render("BTC/USDT", &[]).unwrap_err();
        assert!(matches!(err, Error::Chart(_)));
    }

    #[test]
    fn nan_prices_are_a_chart_error() {
        let mut candles = bars(3);
        for c in &mut candles {
            c.low = f64::NAN;
        }
        assert!(matches!(
            CandleChart::default().render("BTC/USDT", &candles),
            Err(Error::Chart(_))
        ));
    }
}
