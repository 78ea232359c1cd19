//! File formats: surface JSON, detector position tables, sampled ray tables.

use anyhow::{bail, Context, Result};
use nalgebra::Vector2;
use polars::prelude::*;
use prism::api::{AnySurface, ExtrudedPolygon, ImpactRay};
use std::fs;
use std::path::Path;

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating output dir {}", parent.display()))?;
        }
    }
    Ok(())
}

pub fn read_surface(path: &Path) -> Result<AnySurface> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing surface {}", path.display()))
}

pub fn write_surface(path: &Path, surface: &AnySurface) -> Result<()> {
    ensure_parent(path)?;
    fs::write(path, serde_json::to_vec_pretty(surface)?)
        .with_context(|| format!("writing {}", path.display()))
}

fn f64_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    df.column(name)
        .with_context(|| format!("missing column `{name}`"))?
        .f64()?
        .into_iter()
        .map(|v| v.with_context(|| format!("null value in column `{name}`")))
        .collect()
}

/// Footprint and vertical extent of a detector position table.
#[derive(Debug)]
pub struct Footprint {
    /// Mean xy position of each string, sorted by string id.
    pub strings: Vec<Vector2<f64>>,
    /// Lowest and highest module z over all rows.
    pub z_range: (f64, f64),
}

/// Read a `string,om,x,y,z` CSV; string positions are averaged over modules.
pub fn read_footprint(path: &Path) -> Result<Footprint> {
    let lf = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(Some(100))
        .finish()
        .with_context(|| format!("opening {}", path.display()))?;
    let coords = [col("x"), col("y"), col("z")].map(|c| c.cast(DataType::Float64));

    let per_string = lf
        .clone()
        .group_by([col("string")])
        .agg([coords[0].clone().mean(), coords[1].clone().mean()])
        .sort(["string"], Default::default())
        .collect()
        .with_context(|| format!("averaging strings in {}", path.display()))?;
    let xs = f64_column(&per_string, "x")?;
    let ys = f64_column(&per_string, "y")?;

    let extent = lf
        .select([
            coords[2].clone().min().alias("z_min"),
            coords[2].clone().max().alias("z_max"),
        ])
        .collect()?;
    let (z_min, z_max) = match (
        f64_column(&extent, "z_min")?.first(),
        f64_column(&extent, "z_max")?.first(),
    ) {
        (Some(&lo), Some(&hi)) => (lo, hi),
        _ => bail!("{} has no rows", path.display()),
    };

    tracing::info!(
        strings = xs.len(),
        z_min,
        z_max,
        path = %path.display(),
        "read detector positions"
    );
    Ok(Footprint {
        strings: xs.into_iter().zip(ys).map(|(x, y)| Vector2::new(x, y)).collect(),
        z_range: (z_min, z_max),
    })
}

impl Footprint {
    /// The extruded hull of the string positions, padded by `padding`.
    pub fn to_surface(&self, padding: f64) -> Result<ExtrudedPolygon> {
        ExtrudedPolygon::with_padding(&self.strings, self.z_range, padding)
            .with_context(|| format!("building footprint hull with padding {padding}"))
    }
}

/// Write sampled rays (position, propagation direction, projected area) as
/// Parquet for a `.parquet` path, CSV otherwise.
pub fn write_rays(path: &Path, rays: &[ImpactRay]) -> Result<()> {
    ensure_parent(path)?;
    let pick = |f: fn(&ImpactRay) -> f64| rays.iter().map(f).collect::<Vec<f64>>();
    let mut df = df!(
        "x" => pick(|r| r.position.x),
        "y" => pick(|r| r.position.y),
        "z" => pick(|r| r.position.z),
        "dx" => pick(|r| r.direction.x),
        "dy" => pick(|r| r.direction.y),
        "dz" => pick(|r| r.direction.z),
        "projected_area" => pick(|r| r.projected_area),
    )?;
    let mut file = fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    if path.extension().is_some_and(|ext| ext == "parquet") {
        ParquetWriter::new(&mut file).finish(&mut df)?;
    } else {
        CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;
    }
    tracing::debug!(rows = df.height(), path = %path.display(), "wrote rays");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;
    use prism::api::{Surface, UprightSurface};
    use tempfile::tempdir;

    const POSITIONS: &str = "string,om,x,y,z
1,1,0.0,0.0,-10
1,2,0.0,0.0,10
2,1,9.0,0.0,-12
2,2,11.0,0.0,8
3,1,10.0,10.0,0
4,1,0,10,5
";

    #[test]
    fn footprint_averages_each_string() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("geo.csv");
        fs::write(&path, POSITIONS).unwrap();
        let fp = read_footprint(&path).unwrap();
        assert_eq!(
            fp.strings,
            vec![
                Vector2::new(0.0, 0.0),
                Vector2::new(10.0, 0.0),
                Vector2::new(10.0, 10.0),
                Vector2::new(0.0, 10.0)
            ]
        );
        assert_eq!(fp.z_range, (-12.0, 10.0));
        let surface = fp.to_surface(1.0).unwrap();
        assert_eq!(surface.z_range(), (-13.0, 11.0));
        assert!(surface.contains_xy(Vector2::new(-0.5, 10.5)));
    }

    #[test]
    fn footprint_needs_three_strings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("line.csv");
        fs::write(&path, "string,om,x,y,z\n1,1,0,0,0\n2,1,1,1,1\n").unwrap();
        let fp = read_footprint(&path).unwrap();
        assert!(fp.to_surface(0.0).is_err());
    }

    #[test]
    fn surface_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/surface.json");
        let surface = AnySurface::Cylinder(
            prism::api::Cylinder::new(100.0, 20.0, Vector3::zeros()).unwrap(),
        );
        write_surface(&path, &surface).unwrap();
        assert_eq!(read_surface(&path).unwrap(), surface);
        fs::write(&path, "{\"shape\": \"torus\"}").unwrap();
        assert!(read_surface(&path).is_err());
    }

    #[test]
    fn expanded_polygon_reloads_bit_for_bit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("padded.json");
        let tri = [
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(0.0, 1.0),
        ];
        let padded = ExtrudedPolygon::with_padding(&tri, (-1.0, 1.0), 0.25).unwrap();
        let surface = AnySurface::from(padded);
        write_surface(&path, &surface).unwrap();
        assert_eq!(read_surface(&path).unwrap(), surface);
    }

    #[test]
    fn rays_are_written_as_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rays.csv");
        let ray = ImpactRay {
            position: Vector3::new(1.0, 2.0, 3.0),
            direction: Vector3::new(0.0, 0.0, -1.0),
            projected_area: 4.5,
        };
        write_rays(&path, &[ray, ray]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().next(), Some("x,y,z,dx,dy,dz,projected_area"));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn rays_are_written_as_parquet() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rays.parquet");
        let ray = ImpactRay {
            position: Vector3::new(1.0, 2.0, 3.0),
            direction: Vector3::new(0.0, 0.0, -1.0),
            projected_area: 4.5,
        };
        write_rays(&path, &[ray]).unwrap();
        let df = ParquetReader::new(fs::File::open(&path).unwrap())
            .finish()
            .unwrap();
        assert_eq!(df.shape(), (1, 7));
        assert_eq!(f64_column(&df, "projected_area").unwrap(), vec![4.5]);
    }
}
