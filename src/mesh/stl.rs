//! STL codec, binary and ASCII. Binary files are sniffed by the absence of
//! the ASCII `solid ` header line.

use crate::mesh::{MeshError, TriangleMesh};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use nalgebra::Vector3;
use std::io::{BufRead, BufReader, BufWriter};
use std::io::{Read, Result, Seek, Write};
use std::path::Path;

pub fn write_stl<W: Write>(writer: &mut W, mesh: &TriangleMesh) -> Result<()> {
    let mut writer = BufWriter::new(writer);

    // 80 byte header, then triangle count
    writer.write_all(&[0u8; 80])?;
    writer.write_u32::<LittleEndian>(mesh.triangle_len() as u32)?;
    for t in 0..mesh.triangle_len() {
        for f in &mesh.triangle_normal(t) {
            writer.write_f32::<LittleEndian>(*f)?;
        }
        for &n in mesh.triangle(t) {
            for c in mesh.node(n) {
                writer.write_f32::<LittleEndian>(*c)?;
            }
        }
        // Attribute byte count
        writer.write_u16::<LittleEndian>(0)?;
    }
    writer.flush()
}

pub fn read_stl<R: Read + Seek>(read: &mut R) -> Result<TriangleMesh> {
    if is_ascii_stl(read).is_ok() {
        read_ascii_stl(read)
    } else {
        read_binary_stl(read)
    }
}

// Header + triangle count, then 50 bytes per facet.
const BINARY_HEADER_LEN: u64 = 84;
const BINARY_FACET_LEN: u64 = 50;

fn read_binary_stl<R: Read + Seek>(read: &mut R) -> Result<TriangleMesh> {
    let stream_len = read.seek(std::io::SeekFrom::End(0))?;
    read.seek(std::io::SeekFrom::Start(0))?;

    let mut reader = BufReader::new(read);
    reader.read_exact(&mut [0u8; 80])?;
    let num_triangles = reader.read_u32::<LittleEndian>()? as usize;

    // The declared count comes from an untrusted header; a count the stream
    // cannot hold must fail as corrupt data, not drive the allocator.
    let stream_capacity = stream_len.saturating_sub(BINARY_HEADER_LEN) / BINARY_FACET_LEN;
    if num_triangles as u64 > stream_capacity {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "header declares {} triangles but the stream only holds {}",
                num_triangles, stream_capacity
            ),
        ));
    }
    let mut result = TriangleMesh::with_capacity(num_triangles * 3, num_triangles);

    for _ in 0..num_triangles {
        // Stored facet normal is ignored; it is recomputed on write.
        let mut _normal = Vector3::<f32>::zeros();
        for f in &mut _normal {
            *f = reader.read_f32::<LittleEndian>()?;
        }

        let mut indices = [0; 3];
        for i in &mut indices {
            let mut position = Vector3::<f32>::zeros();
            for c in &mut position {
                *c = reader.read_f32::<LittleEndian>()?;
            }
            *i = result.add_node(position);
        }
        reader.read_u16::<LittleEndian>()?;
        result.add_triangle(indices);
    }

    Ok(result)
}

pub fn is_ascii_stl<R: Read + Seek>(read: &mut R) -> Result<()> {
    let mut header = String::new();
    let maybe_read_error = BufReader::new(&mut *read).read_line(&mut header);
    // Try to seek back to start before evaluating potential read errors.
    read.seek(std::io::SeekFrom::Start(0))?;
    maybe_read_error?;
    if header.starts_with("solid ") || header.trim_end() == "solid" {
        Ok(())
    } else {
        Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("ascii starts with solid, found: {:?}", header),
        ))
    }
}

fn ascii_expect_static<L>(lines: &mut L, expectation: &[&str]) -> Result<()>
where
    L: Iterator<Item = Result<Vec<String>>>,
{
    if let Some(line) = lines.next() {
        let line = line?;
        if line != expectation {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("expected {:?}, got {:?}", expectation, line),
            ));
        }
    } else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("EOF while expecting {:?}", expectation),
        ));
    }
    Ok(())
}

fn ascii_tokens_to_vec3(tokens: &[String]) -> Result<Vector3<f32>> {
    let mut result = Vector3::zeros();
    for i in 0..3 {
        result[i] = tokens[i].parse::<f32>().map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("expected f32, got {:?}: {}", tokens[i], e),
            )
        })?;
        if !result[i].is_finite() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("expected finite f32, got {}", result[i]),
            ));
        }
    }
    Ok(result)
}

fn read_ascii_stl<R: Read>(read: &mut R) -> Result<TriangleMesh> {
    // Only call if is_ascii_stl passes
    let mut lines = BufReader::new(read).lines();
    lines.next();

    let mut tokens = lines.map(|result| {
        result.map(|l| {
            // Make lines into iterator over vectors of tokens
            l.split_whitespace()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
        })
    });

    let mut result = TriangleMesh::new();
    loop {
        let face_header: Option<Result<Vec<String>>> = tokens.next();
        let Some(face_header) = face_header else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "EOF while expecting facet or endsolid.",
            ));
        };
        let face_header = face_header?;
        if !face_header.is_empty() && face_header[0] == "endsolid" {
            break;
        }
        if face_header.len() != 5 || face_header[0] != "facet" || face_header[1] != "normal" {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("invalid facet header: {:?}", face_header),
            ));
        }
        let _normal = ascii_tokens_to_vec3(&face_header[2..5])?;
        ascii_expect_static(&mut tokens, &["outer", "loop"])?;
        let mut triangle_indices = [0; 3];
        for vertex_result in &mut triangle_indices {
            if let Some(line) = tokens.next() {
                let line = line?;
                if line.len() != 4 || line[0] != "vertex" {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("vertex f32 f32 f32, got {:?}", line),
                    ));
                }
                *vertex_result = result.add_node(ascii_tokens_to_vec3(&line[1..4])?);
            } else {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "EOF while expecting vertex",
                ));
            }
        }
        result.add_triangle(triangle_indices);
        ascii_expect_static(&mut tokens, &["endloop"])?;
        ascii_expect_static(&mut tokens, &["endfacet"])?;
    }
    Ok(result)
}

pub fn write_stl_file(path: &Path, mesh: &TriangleMesh) -> std::result::Result<(), MeshError> {
    let mut output_file = std::fs::File::create(path).map_err(|source| MeshError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    write_stl(&mut output_file, mesh).map_err(|source| MeshError::Write {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_stl_file(path: &Path) -> std::result::Result<TriangleMesh, MeshError> {
    let input_file = std::fs::File::open(path).map_err(|source| MeshError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut input_reader = BufReader::new(input_file);
    read_stl(&mut input_reader).map_err(|e| match e.kind() {
        std::io::ErrorKind::InvalidData | std::io::ErrorKind::UnexpectedEof => MeshError::Parse {
            path: path.to_path_buf(),
            details: e.to_string(),
        },
        _ => MeshError::Read {
            path: path.to_path_buf(),
            source: e,
        },
    })
}
